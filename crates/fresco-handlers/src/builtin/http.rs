use std::collections::HashMap;

use async_trait::async_trait;
use minijinja::Environment;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::HandlerError;
use crate::handler::{StepContext, StepHandler};

/// Configuration schema for `api-call` fragments.
///
/// The URL is a minijinja template rendered against the node input, so
/// upstream outputs can address path segments and query parameters. When no
/// body is configured, non-GET/HEAD requests send the merged input.
#[derive(Debug, Deserialize)]
struct HttpConfig {
  #[serde(default = "default_method")]
  method: String,
  url: String,
  #[serde(default)]
  headers: HashMap<String, String>,
  #[serde(default)]
  body: Option<Value>,
}

fn default_method() -> String {
  "GET".to_string()
}

/// Built-in handler for `api-call` fragments.
pub struct HttpHandler {
  client: Client,
}

impl HttpHandler {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl StepHandler for HttpHandler {
  fn type_name(&self) -> &str {
    "api-call"
  }

  async fn run(&self, ctx: StepContext) -> Result<Value, HandlerError> {
    let config: HttpConfig =
      serde_json::from_value(Value::Object(ctx.config)).map_err(|e| HandlerError::InvalidConfig {
        message: e.to_string(),
      })?;

    let method = parse_method(&config.method)?;
    let url = render_url(&config.url, &ctx.input)?;
    debug!(method = %method, url = %url, "http_request");

    let mut request = self.client.request(method.clone(), &url);
    for (key, value) in &config.headers {
      request = request.header(key, value);
    }

    let body = config.body.or_else(|| {
      if method == Method::GET || method == Method::HEAD {
        None
      } else {
        Some(ctx.input.clone())
      }
    });
    if let Some(body) = &body {
      request = request.json(body);
    }

    let send = async {
      let response = request.send().await?;

      let status = response.status().as_u16();
      let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(k, v)| {
          v.to_str()
            .ok()
            .map(|val| (k.as_str().to_string(), val.to_string()))
        })
        .collect();

      let body = response.text().await?;
      // Try to parse the body as JSON, fall back to string
      let body_value = serde_json::from_str(&body).unwrap_or(Value::String(body));

      Ok(serde_json::json!({
        "status": status,
        "headers": headers,
        "body": body_value,
      }))
    };

    tokio::select! {
      result = send => result,
      _ = ctx.cancel.cancelled() => Err(HandlerError::Cancelled),
    }
  }
}

fn parse_method(method: &str) -> Result<Method, HandlerError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    _ => Err(HandlerError::InvalidConfig {
      message: format!("unsupported HTTP method: {method}"),
    }),
  }
}

fn render_url(template: &str, input: &Value) -> Result<String, HandlerError> {
  let env = Environment::new();
  env
    .render_str(template, minijinja::Value::from_serialize(input))
    .map_err(|e| HandlerError::Template {
      message: format!("failed to render url: {e}"),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_method_case_insensitive() {
    assert_eq!(parse_method("get").unwrap(), Method::GET);
    assert_eq!(parse_method("POST").unwrap(), Method::POST);
    assert_eq!(parse_method("Patch").unwrap(), Method::PATCH);
  }

  #[test]
  fn test_parse_method_rejects_unknown() {
    let err = parse_method("TRACE").unwrap_err();
    assert!(matches!(err, HandlerError::InvalidConfig { message } if message.contains("TRACE")));
  }

  #[test]
  fn test_render_url_with_input_fields() {
    let url = render_url(
      "https://api.example.com/users/{{ user_id }}?page={{ page }}",
      &json!({"user_id": 42, "page": 2}),
    )
    .unwrap();
    assert_eq!(url, "https://api.example.com/users/42?page=2");
  }

  #[test]
  fn test_render_url_passes_literal_through() {
    let url = render_url("https://api.example.com/health", &json!({})).unwrap();
    assert_eq!(url, "https://api.example.com/health");
  }

  #[test]
  fn test_config_defaults() {
    let config: HttpConfig =
      serde_json::from_value(json!({"url": "https://api.example.com"})).unwrap();
    assert_eq!(config.method, "GET");
    assert!(config.headers.is_empty());
    assert!(config.body.is_none());
  }

  #[test]
  fn test_config_requires_url() {
    let result: Result<HttpConfig, _> = serde_json::from_value(json!({"method": "GET"}));
    assert!(result.is_err());
  }
}
