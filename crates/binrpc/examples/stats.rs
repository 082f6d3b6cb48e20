//! Print transaction statistics from a running server.
//!
//! ```sh
//! cargo run --example stats -- unix:/run/kamailio/kamailio_ctl
//! ```

use binrpc::client::connect;
use binrpc::codec::Value;
use binrpc::transport::Endpoint;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint: Endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "unix:/run/kamailio/kamailio_ctl".to_string())
        .parse()?;

    let mut client = connect(&endpoint)?;
    let records = client.issue("tm.stats", &[])?;

    for record in &records {
        match record.value() {
            Value::Aggregate(items) => {
                for item in items {
                    let value = item
                        .value
                        .convert::<String>()
                        .unwrap_or_else(|_| "<struct>".to_string());
                    println!("{:<16} {value}", item.key);
                }
            }
            _ => println!("{}", record.convert::<String>()?),
        }
    }
    Ok(())
}
