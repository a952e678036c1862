use std::path::Path;

use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum ConfigArgs {
    /// Print every configuration key and value
    List,

    /// Print the value of a single configuration key
    Get(ConfigGetArgs),

    /// Set a configuration key to a value
    Set(ConfigSetArgs),
}

#[derive(Args, Debug)]
pub struct ConfigGetArgs {
    key: String,
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    key: String,
    value: String,
}

pub async fn config(db_path: &Path, args: ConfigArgs) -> anyhow::Result<()> {
    let (_repository, config_store) = super::open(db_path).await?;

    match args {
        ConfigArgs::List => {
            for (key, value) in config_store.all().await? {
                println!("{key}={value}");
            }
        }
        ConfigArgs::Get(args) => match config_store.get(&args.key).await? {
            Some(value) => println!("{value}"),
            None => println!("(unset)"),
        },
        ConfigArgs::Set(args) => {
            config_store.set(&args.key, &args.value).await?;
            println!("{}={}", args.key, args.value);
        }
    }
    Ok(())
}
