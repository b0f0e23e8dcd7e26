//! Status command - show the current session state

use std::path::Path;

/// Handle the status command
pub fn handle_status(config_path: &Path) -> Result<(), String> {
    let mut auth = super::build_context(config_path)?;
    auth.bootstrap()
        .map_err(|e| format!("Failed to restore session state: {}", e))?;

    match auth.current_session() {
        Some(session) => {
            println!("Signed in as {}.", session.username);
            println!("Session established at {}.", session.established_at);
        }
        None => println!("Not signed in."),
    }
    Ok(())
}
