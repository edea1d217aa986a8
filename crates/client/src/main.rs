use anyhow::{Context, bail};

use orgauth_client::auth::OrgId;
use orgauth_client::{AuthClient, ClientConfig};

const USAGE: &str = "usage: orgauth-check '<Authorization header>' [--org <uuid> [--min-role <role>]]";

struct Args {
    header: String,
    org_id: Option<OrgId>,
    min_role: Option<String>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let header = raw.next().context(USAGE)?;
    let mut org_id = None;
    let mut min_role = None;

    while let Some(flag) = raw.next() {
        match flag.as_str() {
            "--org" => {
                let value = raw.next().context("--org needs a value")?;
                org_id = Some(value.parse::<OrgId>().context("--org is not a valid org id")?);
            }
            "--min-role" => min_role = Some(raw.next().context("--min-role needs a value")?),
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }

    if min_role.is_some() && org_id.is_none() {
        bail!("--min-role requires --org\n{USAGE}");
    }

    Ok(Args {
        header,
        org_id,
        min_role,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orgauth_observability::init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = ClientConfig::from_env().context("loading configuration")?;
    let client = AuthClient::init(&config).await.context("initializing client")?;

    let output = match (args.org_id, args.min_role.as_deref()) {
        (Some(org_id), Some(role)) => {
            serde_json::to_value(client.get_user_with_org_by_minimum_role(&args.header, org_id, role)?)?
        }
        (Some(org_id), None) => {
            serde_json::to_value(client.get_user_with_org(&args.header, org_id)?)?
        }
        (None, _) => serde_json::to_value(client.get_user(&args.header)?)?,
    };

    tracing::info!("authorization check passed");
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
