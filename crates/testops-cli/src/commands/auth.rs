use anyhow::Result;
use testops_application::CopilotUseCase;
use testops_core::session::Credentials;

pub async fn login(app: &CopilotUseCase, email: String, password: String) -> Result<()> {
    let session = app.login(&Credentials::new(email, password)).await?;
    println!(
        "Signed in as {} <{}> ({})",
        session.user.name, session.user.email, session.user.role
    );
    Ok(())
}

pub async fn logout(app: &CopilotUseCase) -> Result<()> {
    app.logout().await;
    println!("Signed out");
    Ok(())
}
