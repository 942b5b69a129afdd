//! Command handlers grouped by concern.

pub(crate) mod copy;
pub(crate) mod grants;
pub(crate) mod ls;
