//! Child process launching with secrets injected into the environment.
//!
//! The child inherits the launcher's environment and standard streams; secret
//! fields are layered on top, overriding inherited variables of the same name.
//! Its exit code becomes the launcher's exit code.

use crate::error::ExecError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use tracing::{debug, info, warn};

/// Locate the program of `command` on `PATH`.
///
/// Run before talking to Vault so a typo fails fast.
///
/// # Errors
///
/// [`ExecError::EmptyCommand`] for an empty vector,
/// [`ExecError::CommandNotFound`] if the program cannot be resolved.
pub fn resolve_program(command: &[String]) -> Result<PathBuf, ExecError> {
    let program = command.first().ok_or(ExecError::EmptyCommand)?;
    which::which(program).map_err(|_| ExecError::CommandNotFound(program.clone()))
}

/// Run `command` with `secrets` added to the inherited environment.
///
/// Blocks until the child exits and returns its exit code. SIGINT is ignored
/// by the launcher for the lifetime of the process so that Ctrl+C reaches the
/// child, which shares the terminal's process group, and the launcher can
/// still report how the child ended.
///
/// # Errors
///
/// [`ExecError::EmptyCommand`] for an empty vector, [`ExecError::Spawn`] if
/// the OS refuses to start the program, [`ExecError::Wait`] if the child's
/// exit status cannot be collected.
pub fn run_command(command: &[String], secrets: &HashMap<String, String>) -> Result<i32, ExecError> {
    let (program, args) = command.split_first().ok_or(ExecError::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args).envs(secrets);

    debug!(
        program = %program,
        injected = ?secrets.keys().collect::<Vec<_>>(),
        "Executing command"
    );

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: program.clone(),
        source,
    })?;

    forward_interrupts();

    let status = child.wait().map_err(|source| ExecError::Wait {
        program: program.clone(),
        source,
    })?;

    let code = exit_code_of(status);
    info!(code, "Command finished");
    Ok(code)
}

/// Keep the launcher alive on Ctrl+C while the child handles it.
fn forward_interrupts() {
    if let Err(e) = ctrlc::set_handler(|| {
        debug!("Received SIGINT, waiting for command to exit");
    }) {
        warn!("Failed to set SIGINT handler: {}", e);
    }
}

/// Shell-style exit code: the child's code, or `128 + signal` if killed.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(
            run_command(&[], &HashMap::new()),
            Err(ExecError::EmptyCommand)
        ));
        assert!(matches!(resolve_program(&[]), Err(ExecError::EmptyCommand)));
    }

    #[test]
    fn test_resolve_missing_program() {
        let result = resolve_program(&argv(&["nonexistent_command_xyz_123"]));
        assert!(matches!(result, Err(ExecError::CommandNotFound(p)) if p == "nonexistent_command_xyz_123"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_program_on_path() {
        let path = resolve_program(&argv(&["sh", "-c", "true"])).unwrap();
        assert!(path.ends_with("sh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_propagates_exit_code() {
        let code = run_command(&argv(&["sh", "-c", "exit 3"]), &HashMap::new()).unwrap();
        assert_eq!(code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_secrets_are_visible_to_child() {
        let mut secrets = HashMap::new();
        secrets.insert("VAULTKENV_TEST_USER".to_string(), "alice".to_string());

        let code = run_command(
            &argv(&["sh", "-c", "test \"$VAULTKENV_TEST_USER\" = alice"]),
            &secrets,
        )
        .unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_inherited_environment_is_kept() {
        let code = run_command(&argv(&["sh", "-c", "test -n \"$PATH\""]), &HashMap::new()).unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_death_maps_to_128_plus_signal() {
        let code = run_command(&argv(&["sh", "-c", "kill -TERM $$"]), &HashMap::new()).unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[test]
    fn test_spawn_failure() {
        let result = run_command(&argv(&["/nonexistent/bin/tool"]), &HashMap::new());
        assert!(matches!(result, Err(ExecError::Spawn { .. })));
    }
}
