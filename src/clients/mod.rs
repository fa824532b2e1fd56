/// Browser launcher for the game's dev UI.
pub mod browser;
/// Repository sync through the `git` command line.
pub mod git;
/// Health endpoint client for the launched game.
pub mod health_probe;
/// Tool-invocation channel to a running IDE.
pub mod ide_tools;
/// Spawned child processes and their exit tracking.
pub mod process;
