//! Module processes through `std::process`.

use crate::loader::LoaderError;
use crate::ports::{ChildProcess, ProcessLauncher};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct StdProcessLauncher;

impl StdProcessLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for StdProcessLauncher {
    fn spawn(
        &mut self,
        module: &str,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<Box<dyn ChildProcess>, LoaderError> {
        let child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| LoaderError::Spawn {
                module: module.to_string(),
                message: e.to_string(),
            })?;
        info!(module = %module, pid = child.id(), "Module process spawned");
        Ok(Box::new(StdChild {
            module: module.to_string(),
            child,
        }))
    }
}

#[derive(Debug)]
pub struct StdChild {
    module: String,
    child: Child,
}

impl ChildProcess for StdChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> Result<Option<i32>, LoaderError> {
        self.child
            .try_wait()
            .map(|status| status.map(|s| s.code().unwrap_or(-1)))
            .map_err(|e| LoaderError::Spawn {
                module: self.module.clone(),
                message: e.to_string(),
            })
    }

    fn kill_and_wait(&mut self) -> Result<(), LoaderError> {
        let to_error = |e: std::io::Error| LoaderError::Spawn {
            module: self.module.clone(),
            message: e.to_string(),
        };
        // kill fails if the child already exited; wait still reaps it
        let _ = self.child.kill();
        self.child.wait().map_err(to_error)?;
        Ok(())
    }
}
