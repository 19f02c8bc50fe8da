use serde_json::{json, Value};
use skylark_http::{Query, SkylarkClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api = SkylarkClient::from_env().map_err(anyhow::Error::msg)?;

    let created: Value = api
        .post("/flights", json!({"callsign": "SKY123"}), ())
        .await?;
    println!("created: {created}");

    let flights: Value = api
        .get("/flights", Query::from([("limit", "10")]))
        .await?;
    println!("flights: {flights}");

    Ok(())
}
