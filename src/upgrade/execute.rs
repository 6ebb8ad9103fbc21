//! Phase 2: refresh the chart index and run queued scripts in order.

use log::{debug, info};

use crate::chart::ChartRepository;
use crate::error::Result;
use crate::executable::{run, ExecutableExtension, ScriptRunner};

/// Run `executables` in order, stopping at the first failure.
///
/// The chart index is refreshed once beforehand, and only when there is
/// something to run. Pass `None` for `charts` to skip the refresh.
pub fn execute(
    executables: &[ExecutableExtension],
    charts: Option<&dyn ChartRepository>,
    runner: &dyn ScriptRunner,
) -> Result<usize> {
    if executables.is_empty() {
        debug!("No extension scripts queued");
        return Ok(0);
    }

    match charts {
        Some(charts) => {
            info!("Updating chart repositories");
            charts.refresh_index()?;
        }
        None => debug!("Skipping chart repository update"),
    }

    for executable in executables {
        info!("{}", announcement(executable));
        run(runner, executable)?;
    }
    Ok(executables.len())
}

/// The line logged before a script runs; bindings are listed only when present.
fn announcement(executable: &ExecutableExtension) -> String {
    if executable.env.is_empty() {
        format!("Preparing {}", executable.name)
    } else {
        format!(
            "Preparing {} with environment variables {}",
            executable.name,
            executable.describe_env()
        )
    }
}
