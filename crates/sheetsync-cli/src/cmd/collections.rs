use anyhow::Result;
use mongo_source::MongoSource;
use sheetsync_core::config::{process_env, SourceConfig};
use sheetsync_core::Source;

use crate::output::print_json;

/// Print the collection names a sync would mirror, in enumeration order.
pub fn run(json: bool) -> Result<()> {
    let config = SourceConfig::from_lookup(process_env)?;

    let rt = tokio::runtime::Runtime::new()?;
    let names = rt.block_on(async {
        let source = MongoSource::connect(&config.uri, &config.database).await?;
        Ok::<_, anyhow::Error>(source.list_collections().await?)
    })?;

    if json {
        print_json(&names)?;
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}
