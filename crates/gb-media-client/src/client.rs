//! The media-engine HTTP client (spec §4.10, component C10): every call is
//! a GET against `/index/api/*` with `secret` as the auth token, mirroring
//! `examples/original_source/sip/zlm.go`. A non-zero `code` in the JSON
//! body is the engine's own failure signal and is surfaced as
//! `MediaEngineFailure`, independent of the HTTP status.

use gb_infra::{Error, Result};

use crate::types::{
    ApiResult, MediaListQuery, MediaListResponse, OpenRtpServerRequest, OpenRtpServerResponse,
    RtpInfoResponse,
};

#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    restful_base: String,
    secret: String,
}

impl MediaClient {
    pub fn new(restful_base: impl Into<String>, secret: impl Into<String>) -> Self {
        MediaClient {
            http: reqwest::Client::new(),
            restful_base: restful_base.into(),
            secret: secret.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.restful_base.trim_end_matches('/'), path)
    }

    pub async fn open_rtp_server(&self, req: OpenRtpServerRequest) -> Result<OpenRtpServerResponse> {
        let mut query = vec![
            ("secret", self.secret.clone()),
            ("stream_id", req.stream_id),
            ("enable_tcp", if req.enable_tcp { "1".to_string() } else { "0".to_string() }),
        ];
        if req.port != 0 {
            query.push(("port", req.port.to_string()));
        }

        let resp: OpenRtpServerResponse = self.get_json("/index/api/openRtpServer", &query).await?;
        if resp.code != 0 {
            return Err(Error::MediaEngineFailure(format!("openRtpServer returned code {}", resp.code)));
        }
        Ok(resp)
    }

    pub async fn close_rtp_server(&self, stream_id: &str) -> Result<()> {
        let query = [("secret", self.secret.clone()), ("stream_id", stream_id.to_string())];
        self.get_json::<ApiResult>("/index/api/closeRtpServer", &query)
            .await
            .and_then(require_zero_code("closeRtpServer"))
    }

    pub async fn get_media_list(&self, filter: MediaListQuery) -> Result<MediaListResponse> {
        let mut query = vec![("secret", self.secret.clone())];
        if let Some(stream_id) = filter.stream_id {
            query.push(("stream", stream_id));
        }
        if let Some(app) = filter.app {
            query.push(("app", app));
        }
        if let Some(schema) = filter.schema {
            query.push(("schema", schema));
        }
        if let Some(vhost) = filter.vhost {
            query.push(("vhost", vhost));
        }
        self.get_json("/index/api/getMediaList", &query).await
    }

    pub async fn get_rtp_info(&self, stream_id: &str) -> Result<RtpInfoResponse> {
        let query = [("secret", self.secret.clone()), ("stream_id", stream_id.to_string())];
        self.get_json("/index/api/getRtpInfo", &query).await
    }

    pub async fn close_streams(&self, stream_id: &str) -> Result<()> {
        let query = [("secret", self.secret.clone()), ("stream", stream_id.to_string())];
        // Mirrors the original: the engine's ack shape here is not
        // contractual, so this call is best-effort and swallows decode
        // errors rather than failing the teardown it's part of.
        let _ = self.get_json::<ApiResult>("/index/api/close_streams", &query).await;
        Ok(())
    }

    pub async fn start_record(&self, stream_id: &str, app: &str) -> Result<()> {
        let query = [
            ("secret", self.secret.clone()),
            ("stream", stream_id.to_string()),
            ("app", app.to_string()),
        ];
        self.get_json::<ApiResult>("/index/api/startRecord", &query)
            .await
            .and_then(require_zero_code("startRecord"))
    }

    pub async fn stop_record(&self, stream_id: &str, app: &str) -> Result<()> {
        let query = [
            ("secret", self.secret.clone()),
            ("stream", stream_id.to_string()),
            ("app", app.to_string()),
        ];
        self.get_json::<ApiResult>("/index/api/stopRecord", &query)
            .await
            .and_then(require_zero_code("stopRecord"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::MediaEngineFailure(e.to_string()))?;
        resp.json::<T>()
            .await
            .map_err(|e| Error::MediaEngineFailure(format!("decode failure from {path}: {e}")))
    }
}

fn require_zero_code(call: &'static str) -> impl FnOnce(ApiResult) -> Result<()> {
    move |res| {
        if res.code == 0 {
            Ok(())
        } else {
            Err(Error::MediaEngineFailure(format!("{call} returned code {}", res.code)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash_from_base() {
        let client = MediaClient::new("http://127.0.0.1:8080/", "s3cr3t");
        assert_eq!(client.endpoint("/index/api/getMediaList"), "http://127.0.0.1:8080/index/api/getMediaList");
    }

    #[test]
    fn require_zero_code_rejects_nonzero() {
        let err = require_zero_code("startRecord")(ApiResult { code: 1 }).unwrap_err();
        assert!(matches!(err, Error::MediaEngineFailure(_)));
    }

    #[tokio::test]
    async fn open_rtp_server_surfaces_nonzero_engine_code() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index/api/openRtpServer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": -1, "port": 0})))
            .mount(&server)
            .await;

        let client = MediaClient::new(server.uri(), "s3cr3t");
        let err = client
            .open_rtp_server(OpenRtpServerRequest { stream_id: "0000000001".to_string(), enable_tcp: false, port: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MediaEngineFailure(_)));
    }

    #[tokio::test]
    async fn open_rtp_server_returns_assigned_port_on_success() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index/api/openRtpServer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0, "port": 30512})))
            .mount(&server)
            .await;

        let client = MediaClient::new(server.uri(), "s3cr3t");
        let resp = client
            .open_rtp_server(OpenRtpServerRequest { stream_id: "0000000001".to_string(), enable_tcp: false, port: 0 })
            .await
            .unwrap();
        assert_eq!(resp.port, 30512);
    }
}
