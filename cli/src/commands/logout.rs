//! Logout command - tear down the local session

use std::path::Path;

/// Handle the logout command
pub fn handle_logout(config_path: &Path) -> Result<(), String> {
    let mut auth = super::build_context(config_path)?;
    auth.bootstrap()
        .map_err(|e| format!("Failed to restore session state: {}", e))?;

    if !auth.is_authenticated() {
        println!("No session to clear.");
        return Ok(());
    }

    auth.sign_out()
        .map_err(|e| format!("Failed to clear session: {}", e))?;
    println!("Signed out.");
    Ok(())
}
