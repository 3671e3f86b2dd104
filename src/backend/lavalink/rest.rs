use reqwest::{Response, StatusCode};

use super::LavalinkNode;
use crate::{
    common::{errors::BackendError, types::GuildId},
    protocol::{
        models::{ErrorResponse, PlayerUpdate},
        tracks::LoadResult,
    },
};

impl LavalinkNode {
    fn player_url(&self, guild_id: &GuildId) -> Result<String, BackendError> {
        let session_id = self.session_id().ok_or(BackendError::NotReady)?;
        Ok(format!(
            "{}/v4/sessions/{}/players/{}",
            self.config.rest_base(),
            session_id,
            guild_id
        ))
    }

    pub(crate) async fn update_player(
        &self,
        guild_id: &GuildId,
        body: &PlayerUpdate,
    ) -> Result<(), BackendError> {
        let url = self.player_url(guild_id)?;
        let response = self.http.patch(url).json(body).send().await?;
        check(response).await?;
        Ok(())
    }

    pub(crate) async fn destroy_player(&self, guild_id: &GuildId) -> Result<(), BackendError> {
        let url = self.player_url(guild_id)?;
        let response = self.http.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    pub(crate) async fn load_tracks(&self, identifier: &str) -> Result<LoadResult, BackendError> {
        let url = format!(
            "{}/v4/loadtracks?identifier={}",
            self.config.rest_base(),
            urlencoding::encode(identifier)
        );
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.json::<LoadResult>().await?)
    }
}

/// Turn a non-2xx response into `Rejected`, using the node's error body when
/// it sent one.
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}
