//! Login admission control: bans, whitelist, username rules, addon match.

use tracing::{info, warn};

use super::session::PlayerRecord;
use super::RelayServer;
use crate::protocol::validation::validate_username;
use crate::protocol::{ClientId, LoginRequest, LoginResponse, LoginStatus, ServerUpdate};

impl RelayServer {
    /// Evaluate a login request and queue the response (plus the current
    /// server settings on success, or the final disconnect frame on
    /// rejection) onto the client's outbox. The returned response tells
    /// the transport whether to keep the connection.
    pub async fn handle_login_request(
        &self,
        client_id: ClientId,
        remote_addr: &str,
        request: LoginRequest,
    ) -> LoginResponse {
        let response = {
            let _guard = self.login_lock.lock().await;
            self.evaluate_login(client_id, remote_addr, &request)
        };

        if let Some(outbox) = self.transport.outbox_for(client_id) {
            outbox
                .send(std::sync::Arc::new(ServerUpdate::LoginResponse(
                    response.clone(),
                )))
                .await;
            match response.status.disconnect_reason() {
                None => {
                    let settings = self.settings.read().await.clone();
                    outbox
                        .send(std::sync::Arc::new(ServerUpdate::ServerSettings(settings)))
                        .await;
                }
                Some(reason) => {
                    outbox
                        .send(std::sync::Arc::new(ServerUpdate::Disconnect { reason }))
                        .await;
                }
            }
        }

        response
    }

    /// First failure wins; each step produces its own reject status.
    fn evaluate_login(
        &self,
        client_id: ClientId,
        remote_addr: &str,
        request: &LoginRequest,
    ) -> LoginResponse {
        let username = &request.username;

        if self.access.is_banned(remote_addr, &request.auth_key) {
            info!(%client_id, %remote_addr, "Login rejected: banned");
            return LoginResponse::reject(LoginStatus::Banned);
        }

        if self.access.whitelist_enabled()
            && !self.access.is_whitelisted(&request.auth_key)
            && !self.access.promote_prelisted(username, &request.auth_key)
        {
            info!(%client_id, %username, "Login rejected: not whitelisted");
            return LoginResponse::reject(LoginStatus::NotWhiteListed);
        }

        if let Err(reason) = validate_username(username) {
            info!(%client_id, %username, %reason, "Login rejected: invalid username");
            return LoginResponse::reject(LoginStatus::InvalidUsername);
        }

        if self.sessions.username_taken(username) {
            info!(%client_id, %username, "Login rejected: username in use");
            return LoginResponse::reject(LoginStatus::InvalidUsername);
        }

        if !self.addons.matches(&request.addons) {
            info!(
                %client_id,
                client_addons = request.addons.len(),
                server_addons = self.addons.identities().len(),
                "Login rejected: addon set mismatch"
            );
            return LoginResponse {
                status: LoginStatus::InvalidAddons,
                addon_order: Vec::new(),
                addons: self.addons.identities(),
            };
        }

        let addon_order = self.addons.addon_order(&request.addons);
        let record = PlayerRecord::reserved(
            client_id,
            remote_addr.to_string(),
            username.clone(),
            request.auth_key.clone(),
        );
        if let Err(err) = self.sessions.insert(record) {
            warn!(%client_id, %err, "Login for an id that already has a record");
            return LoginResponse::reject(LoginStatus::InvalidUsername);
        }

        info!(%client_id, %username, "Login accepted");
        LoginResponse::success(addon_order)
    }
}
