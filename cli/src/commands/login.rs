//! Login command - establish a local session

use std::io::{self, Write};
use std::path::Path;
use tinywins_auth::{CallbackPayload, Navigation, PlatformContext};

/// Handle the login command
pub async fn handle_login(
    config_path: &Path,
    username: Option<String>,
    sandbox: bool,
) -> Result<(), String> {
    let mut auth = super::build_context(config_path)?;
    auth.bootstrap()
        .map_err(|e| format!("Failed to restore session state: {}", e))?;

    if let Some(session) = auth.current_session() {
        println!("Already signed in as {}. Run 'tinywins logout' first.", session.username);
        return Ok(());
    }

    match username {
        Some(username) => handle_password_login(&mut auth, &username).await,
        None => handle_google_login(&mut auth, sandbox).await,
    }
}

/// Drive the federated Google flow from the shell: open the browser,
/// read the pasted redirect URL, feed it to the coordinator.
async fn handle_google_login(
    auth: &mut tinywins_auth::AuthContext,
    sandbox: bool,
) -> Result<(), String> {
    let platform = if sandbox {
        PlatformContext::DevSandbox
    } else {
        PlatformContext::Native
    };

    let handle = auth
        .sign_in_with_google(&platform)
        .map_err(|e| format!("Could not start sign-in: {}", e))?;
    tracing::debug!(
        "sign-in attempt {} redirecting via {}",
        handle.generation,
        handle.redirect_target
    );

    println!();
    println!("Opening browser for Google sign-in...");
    println!();
    println!("If browser doesn't open, visit:");
    // OSC 8 escape sequence makes the URL clickable in supported terminals
    println!(
        "\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\",
        handle.authorization_url, handle.authorization_url
    );
    println!();

    let _ = open::that(&handle.authorization_url);

    print!("Paste the redirect URL (or press Enter to cancel): ");
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|e| format!("Failed to read input: {}", e))?;
    let line = line.trim();

    if line.is_empty() {
        auth.cancel_sign_in();
        println!("Cancelled.");
        return Ok(());
    }

    let payload = CallbackPayload::parse(line);
    match auth.handle_callback(&payload, &platform).await {
        Navigation::ToMain => {
            if let Some(session) = auth.current_session() {
                println!();
                println!("Signed in as {}.", session.username);
            }
            Ok(())
        }
        Navigation::ToSignIn => Err(auth
            .last_failure_message()
            .unwrap_or_else(|| "Sign-in failed, please try again".to_string())),
        Navigation::None => {
            println!("That URL did not carry a sign-in result. Nothing changed.");
            Ok(())
        }
    }
}

async fn handle_password_login(
    auth: &mut tinywins_auth::AuthContext,
    username: &str,
) -> Result<(), String> {
    let password =
        rpassword::prompt_password("Password: ").map_err(|e| format!("Failed to read password: {}", e))?;

    let session = auth
        .sign_in(username, &password)
        .await
        .map_err(|e| e.user_message())?;

    println!();
    println!("Signed in as {}.", session.username);
    Ok(())
}
