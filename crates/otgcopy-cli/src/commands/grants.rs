use otgcopy_storage::{PathPicker, PickerError, TreePicker};
use tracing::debug;

use crate::cli::GrantArgs;
use crate::context::{AppContext, CliResult};
use crate::output::{render_grant, render_grants};

pub(crate) fn handle_grant(ctx: &AppContext, args: GrantArgs) -> CliResult<()> {
    let mut store = ctx.grant_store()?;
    let mut picker = PathPicker::new(&mut store, args.path);
    match picker.acquire_tree() {
        Ok(uri) => render_grant(&uri, ctx.output),
        Err(PickerError::Canceled) => {
            debug!("tree selection canceled");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn handle_grants(ctx: &AppContext) -> CliResult<()> {
    let store = ctx.grant_store()?;
    render_grants(store.trees(), ctx.output)
}
