use otgcopy_storage::DocumentProvider;
use tracing::debug;

use crate::cli::LsArgs;
use crate::context::{AppContext, CliError, CliResult};
use crate::output::render_entries;

pub(crate) fn handle_ls(ctx: &AppContext, args: &LsArgs) -> CliResult<()> {
    let range = args.dates.range()?;
    let provider = ctx.grant_store()?.provider();
    let entries = provider
        .list_children(&args.tree)
        .map_err(CliError::failure)?;
    let listed = entries.len();
    let visible = range.apply(&entries);
    debug!(tree = %args.tree, listed, shown = visible.len(), "listed tree");
    render_entries(&visible, ctx.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{DateArgs, OutputFormat};
    use otgcopy_config::CopySettings;
    use otgcopy_storage::GrantStore;
    use otgcopy_test_support::fixtures::TempTree;

    #[test]
    fn listing_requires_a_granted_tree() -> anyhow::Result<()> {
        let state = tempfile::tempdir()?;
        let tree = TempTree::new()?;
        tree.write_file("a.txt", b"a")?;
        let ctx = AppContext {
            settings: CopySettings {
                state_dir: state.path().to_path_buf(),
                ..CopySettings::default()
            },
            output: OutputFormat::Table,
        };
        let args = LsArgs {
            tree: tree.uri("")?,
            dates: DateArgs::default(),
        };

        assert!(matches!(handle_ls(&ctx, &args), Err(CliError::Failure(_))));

        GrantStore::open(state.path())?.grant(tree.path())?;
        assert!(handle_ls(&ctx, &args).is_ok());
        Ok(())
    }
}
