use chrono::NaiveDate;
use serde_json::Value;

use zeroclick_db::{connect_with_settings, migrations, CrmRepositories, DemoSeedDataset};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

fn require_array<'a>(value: &'a Value, field_name: &str) -> Result<&'a [Value], String> {
    value
        .as_array()
        .map(|values| values.as_slice())
        .ok_or_else(|| format!("{field_name} should be an array"))
}

fn require_field<'a>(value: &'a Value, field_name: &str) -> SeedContractTestResult<&'a Value> {
    value.get(field_name).ok_or_else(|| format!("{field_name} should be present"))
}

fn require_str<'a>(value: &'a Value, field_name: &str) -> Result<&'a str, String> {
    value.as_str().ok_or_else(|| format!("{field_name} should be a string"))
}

async fn seeded_sql_store() -> SeedContractTestResult<CrmRepositories> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    let repos = CrmRepositories::sql(pool);

    let today = NaiveDate::from_ymd_opt(2026, 10, 18).ok_or("invalid seed date")?;
    DemoSeedDataset::load(&repos, today).await.map_err(|error| format!("seed: {error}"))?;
    Ok(repos)
}

#[tokio::test]
async fn seeded_deals_serialize_with_nested_contacts() -> SeedContractTestResult {
    let repos = seeded_sql_store().await?;
    let deals = repos.deals.list().await.map_err(|error| format!("list deals: {error}"))?;
    let payload = serde_json::to_value(&deals).map_err(|error| error.to_string())?;

    let rows = require_array(&payload, "deals")?;
    require_eq!(rows.len(), 3);

    let mut names = Vec::new();
    for row in rows {
        require!(row.get("deal").is_none(), "deal fields should be flattened");
        require_eq!(require_str(require_field(row, "stage")?, "stage")?, "initial");
        require!(require_field(row, "deal_value")?.is_f64(), "deal_value should be numeric");
        require!(require_field(row, "follow_up_date")?.is_string(), "follow_up_date missing");

        let owner = require_field(row, "contacts")?;
        require_eq!(owner.get("id"), row.get("contact_id"), "join should match contact_id");
        names.push(require_str(require_field(owner, "name")?, "contacts.name")?.to_string());
    }

    names.sort();
    require_eq!(names, vec!["Emily Rodriguez", "Michael Chen", "Sarah Johnson"]);
    Ok(())
}

#[tokio::test]
async fn seeded_contacts_carry_demo_details() -> SeedContractTestResult {
    let repos = seeded_sql_store().await?;
    let contacts = repos.contacts.list().await.map_err(|error| format!("contacts: {error}"))?;
    let payload = serde_json::to_value(&contacts).map_err(|error| error.to_string())?;

    let rows = require_array(&payload, "contacts")?;
    require_eq!(rows.len(), 3);

    let sarah = rows
        .iter()
        .find(|row| row.get("name").and_then(Value::as_str) == Some("Sarah Johnson"))
        .ok_or("Sarah Johnson should be seeded")?;
    require_eq!(require_str(require_field(sarah, "company")?, "company")?, "Acme Corp");
    require_eq!(
        require_str(require_field(sarah, "email")?, "email")?,
        "sarah.johnson@acmecorp.com"
    );
    require_eq!(require_str(require_field(sarah, "phone")?, "phone")?, "+1-555-0101");
    Ok(())
}

#[tokio::test]
async fn reseeding_sql_store_is_a_no_op() -> SeedContractTestResult {
    let repos = seeded_sql_store().await?;
    let today = NaiveDate::from_ymd_opt(2026, 10, 18).ok_or("invalid seed date")?;
    let again =
        DemoSeedDataset::load(&repos, today).await.map_err(|error| format!("reseed: {error}"))?;

    require_eq!(again.deals_created(), 0);
    let verification =
        DemoSeedDataset::verify(&repos).await.map_err(|error| format!("verify: {error}"))?;
    require!(verification.all_present, "verification failed: {:?}", verification.checks);
    Ok(())
}
