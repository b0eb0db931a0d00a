//! Login and registration relays.
//!
//! Both forms post `{username, password}`
//! and turn whatever comes back into a
//! single user-facing message. Nothing is
//! retried.

use std::fmt;

use anyhow::Context;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

pub const LOGIN_OK: &str =
  "Login successful";
pub const LOGIN_FAILED: &str =
  "Login failed";
pub const LOGIN_UNREACHABLE: &str =
  "Error logging in";
pub const REGISTER_OK: &str =
  "Registration successful";
pub const REGISTER_FAILED: &str =
  "Registration failed";
pub const REGISTER_UNREACHABLE: &str =
  "Error registering";

#[derive(Clone, Serialize)]
pub struct Credentials {
  pub username: String,
  pub password: String
}

impl fmt::Debug for Credentials {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
  access_token: String
}

#[derive(Debug, Deserialize)]
struct MessageBody {
  #[serde(default)]
  message: Option<String>
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  #[serde(default)]
  error: Option<String>
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub enum LoginOutcome {
  Success {
    access_token: String
  },
  Failed {
    message: String
  }
}

impl LoginOutcome {
  pub fn message(&self) -> &str {
    match self {
      | LoginOutcome::Success {
        ..
      } => LOGIN_OK,
      | LoginOutcome::Failed {
        message
      } => message
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct RegisterOutcome {
  pub succeeded: bool,
  pub message:   String
}

/// What came back from one exchange,
/// before it is turned into a message.
#[derive(Debug, Clone)]
pub enum Reply {
  Answered {
    success: bool,
    body:    String
  },
  Unreachable
}

pub fn login_outcome(
  reply: Reply
) -> LoginOutcome {
  match reply {
    | Reply::Answered {
      success: true,
      body
    } => {
      match serde_json::from_str::<
        TokenBody
      >(&body)
      {
        | Ok(token) => {
          LoginOutcome::Success {
            access_token: token
              .access_token
          }
        }
        | Err(err) => {
          warn!(
            error = %err,
            "login succeeded without a token"
          );
          LoginOutcome::Failed {
            message: LOGIN_FAILED
              .to_string()
          }
        }
      }
    }
    | Reply::Answered {
      success: false,
      body
    } => LoginOutcome::Failed {
      message: error_text(&body)
        .unwrap_or_else(|| {
          LOGIN_FAILED.to_string()
        })
    },
    | Reply::Unreachable => {
      LoginOutcome::Failed {
        message: LOGIN_UNREACHABLE
          .to_string()
      }
    }
  }
}

pub fn register_outcome(
  reply: Reply
) -> RegisterOutcome {
  match reply {
    | Reply::Answered {
      success: true,
      body
    } => {
      let message =
        serde_json::from_str::<
          MessageBody
        >(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
          REGISTER_OK.to_string()
        });
      RegisterOutcome {
        succeeded: true,
        message
      }
    }
    | Reply::Answered {
      success: false,
      body
    } => RegisterOutcome {
      succeeded: false,
      message:   error_text(&body)
        .unwrap_or_else(|| {
          REGISTER_FAILED.to_string()
        })
    },
    | Reply::Unreachable => {
      RegisterOutcome {
        succeeded: false,
        message:   REGISTER_UNREACHABLE
          .to_string()
      }
    }
  }
}

fn error_text(
  body: &str
) -> Option<String> {
  serde_json::from_str::<ErrorBody>(body)
    .ok()
    .and_then(|b| b.error)
    .filter(|e| !e.is_empty())
}

#[derive(Debug, Clone)]
pub struct AuthClient {
  client:   reqwest::Client,
  base_url: String
}

impl AuthClient {
  pub fn new(
    base_url: &str
  ) -> anyhow::Result<Self> {
    let client =
      reqwest::Client::builder()
        .build()
        .context(
          "failed building HTTP client \
           for authentication"
        )?;
    Ok(Self {
      client,
      base_url: base_url
        .trim_end_matches('/')
        .to_string()
    })
  }

  #[tracing::instrument(skip(self, creds), fields(username = %creds.username))]
  pub async fn login(
    &self,
    creds: &Credentials
  ) -> LoginOutcome {
    let reply =
      self.post("login", creds).await;
    let outcome = login_outcome(reply);
    info!(
      succeeded = matches!(
        outcome,
        LoginOutcome::Success { .. }
      ),
      "login finished"
    );
    outcome
  }

  #[tracing::instrument(skip(self, creds), fields(username = %creds.username))]
  pub async fn register(
    &self,
    creds: &Credentials
  ) -> RegisterOutcome {
    let reply =
      self.post("register", creds).await;
    let outcome = register_outcome(reply);
    info!(
      succeeded = outcome.succeeded,
      "registration finished"
    );
    outcome
  }

  async fn post(
    &self,
    path: &str,
    creds: &Credentials
  ) -> Reply {
    let url =
      format!("{}/{path}", self.base_url);
    let payload =
      match serde_json::to_string(creds) {
        | Ok(payload) => payload,
        | Err(err) => {
          warn!(error = %err, "failed encoding credentials");
          return Reply::Unreachable;
        }
      };

    let response = match self
      .client
      .post(url.as_str())
      .header(
        reqwest::header::CONTENT_TYPE,
        "application/json"
      )
      .body(payload)
      .send()
      .await
    {
      | Ok(response) => response,
      | Err(err) => {
        warn!(
          url = %url,
          error = %err,
          "credential request failed"
        );
        return Reply::Unreachable;
      }
    };

    let status = response.status();
    let body =
      match response.text().await {
        | Ok(body) => body,
        | Err(err) => {
          warn!(
            url = %url,
            error = %err,
            "failed reading credential response"
          );
          String::new()
        }
      };
    debug!(%status, "credential response");

    Reply::Answered {
      success: status.is_success(),
      body
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn answered(
    success: bool,
    body: &str
  ) -> Reply {
    Reply::Answered {
      success,
      body: body.to_string()
    }
  }

  #[test]
  fn login_success_carries_token() {
    let outcome = login_outcome(answered(
      true,
      r#"{"message":"Login successful","access_token":"abc"}"#
    ));
    assert_eq!(
      outcome,
      LoginOutcome::Success {
        access_token: "abc".to_string()
      }
    );
    assert_eq!(outcome.message(), LOGIN_OK);
  }

  #[test]
  fn login_failure_surfaces_server_text() {
    let outcome = login_outcome(answered(
      false,
      r#"{"error":"Invalid username or password"}"#
    ));
    assert_eq!(
      outcome.message(),
      "Invalid username or password"
    );
  }

  #[test]
  fn login_failure_falls_back() {
    assert_eq!(
      login_outcome(answered(
        false,
        "<html>502</html>"
      ))
      .message(),
      LOGIN_FAILED
    );
    assert_eq!(
      login_outcome(Reply::Unreachable)
        .message(),
      LOGIN_UNREACHABLE
    );
  }

  #[test]
  fn register_messages() {
    let ok = register_outcome(answered(
      true,
      r#"{"message":"User registered successfully"}"#
    ));
    assert!(ok.succeeded);
    assert_eq!(
      ok.message,
      "User registered successfully"
    );

    let bare =
      register_outcome(answered(true, "{}"));
    assert_eq!(bare.message, REGISTER_OK);

    let taken = register_outcome(answered(
      false,
      r#"{"error":"Username already taken"}"#
    ));
    assert!(!taken.succeeded);
    assert_eq!(
      taken.message,
      "Username already taken"
    );

    let down =
      register_outcome(Reply::Unreachable);
    assert_eq!(
      down.message,
      REGISTER_UNREACHABLE
    );
  }

  #[test]
  fn credentials_serialize_as_flat_body() {
    let creds = Credentials {
      username: "ada".to_string(),
      password: "pw".to_string()
    };
    assert_eq!(
      serde_json::to_value(&creds).unwrap(),
      serde_json::json!({
        "username": "ada",
        "password": "pw"
      })
    );
  }
}
