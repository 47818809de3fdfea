//! RPC client over the `/rpc` endpoint.
//!
//! Queries go out as `GET /rpc/{procedure}?input=<json>`, mutations as a
//! request frame posted to `/rpc`. Either way the reply is a frame; an error
//! frame becomes `CliError::ServerError`.

use protocol::{Frame, Procedure, Status};
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::CliError;

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    pub fn new(base_url: &str) -> Result<Self, CliError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CliError::InvalidBaseUrl(base_url.to_owned()));
        }
        Ok(Self { http: reqwest::Client::new(), base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// Call a procedure and return the raw `data` of the done frame.
    pub async fn call(&self, procedure: Procedure, input: &impl Serialize) -> Result<Value, CliError> {
        let data = serde_json::to_value(input)?;
        let request = if procedure.is_query() {
            self.http.get(self.query_url(procedure, &data)?)
        } else {
            let frame = Frame::request(procedure.name(), data);
            self.http.post(format!("{}/rpc", self.base_url)).json(&frame)
        };

        let reply = request.send().await?.json::<Frame>().await?;
        into_output(reply)
    }

    /// Call a procedure and decode its output.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        procedure: Procedure,
        input: &impl Serialize,
    ) -> Result<T, CliError> {
        let data = self.call(procedure, input).await?;
        Ok(serde_json::from_value(data)?)
    }

    fn query_url(&self, procedure: Procedure, data: &Value) -> Result<Url, CliError> {
        let raw = format!("{}/rpc/{}", self.base_url, procedure.name());
        let mut url = Url::parse(&raw).map_err(|_| CliError::InvalidBaseUrl(self.base_url.clone()))?;
        if !data.is_null() {
            url.query_pairs_mut().append_pair("input", &data.to_string());
        }
        Ok(url)
    }
}

fn into_output(reply: Frame) -> Result<Value, CliError> {
    if !reply.status.is_terminal() {
        return Err(CliError::UnexpectedReply(reply.syscall));
    }
    if reply.status == Status::Error {
        return Err(CliError::ServerError {
            code: reply.error_code().unwrap_or("E_UNKNOWN").to_owned(),
            message: reply.error_message().unwrap_or("unknown server error").to_owned(),
            syscall: reply.syscall,
        });
    }
    Ok(reply.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(RpcClient::new("ws://localhost"), Err(CliError::InvalidBaseUrl(_))));
    }

    #[test]
    fn query_url_encodes_input() {
        let client = RpcClient::new("http://localhost:2022/").expect("valid base url");
        let url = client
            .query_url(Procedure::GetShapes, &json!({"canvas_id": 3}))
            .expect("valid url");
        assert_eq!(url.path(), "/rpc/getShapes");
        let input = url
            .query_pairs()
            .find(|(k, _)| k == "input")
            .map(|(_, v)| v.into_owned());
        assert_eq!(input.as_deref(), Some(r#"{"canvas_id":3}"#));
    }

    #[test]
    fn query_url_omits_null_input() {
        let client = RpcClient::new("http://localhost:2022").expect("valid base url");
        let url = client.query_url(Procedure::GetCanvases, &Value::Null).expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:2022/rpc/getCanvases");
    }

    #[test]
    fn error_frame_becomes_server_error() {
        let req = Frame::request("createShape", Value::Null);
        let err = into_output(req.error("E_CANVAS_NOT_FOUND", "canvas not found: 9")).unwrap_err();
        match err {
            CliError::ServerError { syscall, code, message } => {
                assert_eq!(syscall, "createShape");
                assert_eq!(code, "E_CANVAS_NOT_FOUND");
                assert_eq!(message, "canvas not found: 9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn request_frame_is_not_a_reply() {
        let err = into_output(Frame::request("getCanvases", Value::Null)).unwrap_err();
        assert!(matches!(err, CliError::UnexpectedReply(syscall) if syscall == "getCanvases"));
    }

    #[test]
    fn done_frame_yields_data() {
        let req = Frame::request("deleteShape", Value::Null);
        let data = into_output(req.done_with(json!(true))).expect("done frame");
        assert_eq!(data, json!(true));
    }
}
