//! Sends sample Patreon webhook deliveries to a running gateway.
//!
//! ```bash
//! webhook-tester --secret "$PATREON_WEBHOOK_SECRET" --email patron@example.com
//! ```
//!
//! Exits non-zero if any delivery gets an unexpected status.

use anyhow::Context;
use clap::Parser;
use reqwest::StatusCode;
use tracing_subscriber::EnvFilter;

use patreon_gateway::domain::{EVENT_HEADER, EVENT_PLEDGE_CREATE, EVENT_PLEDGE_DELETE};
use patreon_gateway::patreon::{SIGNATURE_HEADER, sign};

/// Patreon webhook tester
#[derive(Parser, Debug)]
#[clap(name = "webhook-tester")]
#[clap(about = "Send signed sample Patreon webhooks to a running patreon-gateway")]
struct Args {
    /// Webhook endpoint
    #[arg(long, default_value = "http://localhost:3000/api/patreon/webhook")]
    url: String,

    /// Shared webhook secret
    #[arg(long, env = "PATREON_WEBHOOK_SECRET", hide_env_values = true)]
    secret: String,

    /// Member email used in the sample payloads
    #[arg(long, default_value = "webhook-test@example.com")]
    email: String,
}

/// One delivery and the status it should get back.
#[derive(Debug)]
struct Scenario {
    name: &'static str,
    event: &'static str,
    body: String,
    signature: String,
    expected: StatusCode,
}

fn member_payload(email: &str, patron_status: &str) -> String {
    serde_json::json!({
        "data": {
            "type": "member",
            "id": "webhook-tester-member",
            "attributes": {
                "email": email,
                "full_name": "Webhook Tester",
                "patron_status": patron_status,
                "currently_entitled_amount_cents": 500
            }
        }
    })
    .to_string()
}

fn scenarios(args: &Args) -> anyhow::Result<Vec<Scenario>> {
    let create = member_payload(&args.email, "active_patron");
    let delete = member_payload(&args.email, "former_patron");
    let malformed = r#"{"data": {"attributes": {"email": "#.to_string();

    Ok(vec![
        Scenario {
            name: "pledge create",
            event: EVENT_PLEDGE_CREATE,
            signature: sign(&create, &args.secret)?,
            body: create.clone(),
            expected: StatusCode::OK,
        },
        Scenario {
            name: "pledge delete",
            event: EVENT_PLEDGE_DELETE,
            signature: sign(&delete, &args.secret)?,
            body: delete,
            expected: StatusCode::OK,
        },
        Scenario {
            name: "invalid signature",
            event: EVENT_PLEDGE_CREATE,
            signature: "0".repeat(32),
            body: create,
            expected: StatusCode::UNAUTHORIZED,
        },
        Scenario {
            name: "malformed payload",
            event: EVENT_PLEDGE_CREATE,
            signature: sign(&malformed, &args.secret)?,
            body: malformed,
            expected: StatusCode::BAD_REQUEST,
        },
    ])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let http = reqwest::Client::new();
    let mut failures = 0usize;

    for scenario in scenarios(&args)? {
        let response = http
            .post(&args.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(EVENT_HEADER, scenario.event)
            .header(SIGNATURE_HEADER, &scenario.signature)
            .body(scenario.body)
            .send()
            .await
            .with_context(|| format!("sending '{}' to {}", scenario.name, args.url))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == scenario.expected {
            tracing::info!(scenario = scenario.name, status = status.as_u16(), "pass");
        } else {
            failures += 1;
            tracing::error!(
                scenario = scenario.name,
                expected = scenario.expected.as_u16(),
                status = status.as_u16(),
                body = %body,
                "fail"
            );
        }
    }

    anyhow::ensure!(failures == 0, "{failures} webhook scenario(s) failed");
    tracing::info!("all webhook scenarios passed");
    Ok(())
}
