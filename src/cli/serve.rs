use crate::{api::AppState, config::Config, error, info, server, warning};

pub async fn serve(config: Config, open: bool) {
    let address = config.server_address.clone();

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => error!("Cannot initialise the server. Err: {}", e),
    };

    info!("Starting server on http://{}", address);
    if open {
        let login = format!("http://{}/login", address);
        if webbrowser::open(&login).is_err() {
            warning!("Could not open a browser. Visit {} to log in.", login);
        }
    }

    if let Err(e) = server::start_api_server(state).await {
        error!("Server stopped. Err: {}", e);
    }
}
