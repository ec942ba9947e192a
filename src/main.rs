use std::{path::Path, time::Duration};

use tracing::{error, info, span, Level};

mod adapters;
mod manager;
mod model;
mod util;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().json().init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();

    let matches = clap::Command::new("objman")
        .about("bucket and object operations against one configured bucket")
        .arg(
            clap::Arg::new("root")
                .long("root")
                .action(clap::ArgAction::SetTrue)
                .help("treat BUCKET as the designated root bucket"),
        )
        .arg(
            clap::Arg::new("url-ttl")
                .long("url-ttl")
                .value_parser(clap::value_parser!(u64))
                .help("presigned URL lifetime in seconds"),
        )
        .arg(clap::Arg::new("BUCKET").required(true).index(1))
        .arg(clap::Arg::new("OP").required(true).index(2))
        .arg(
            clap::Arg::new("ARGS")
                .num_args(0..)
                .index(3)
                .trailing_var_arg(true),
        )
        .get_matches();

    let bucket_uri = matches.get_one::<String>("BUCKET").unwrap();
    let bucket = util::key::parse_bucket_from_uri(bucket_uri);
    let op = matches.get_one::<String>("OP").unwrap();
    let args: Vec<String> = matches
        .get_many::<String>("ARGS")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    info!(bucket = bucket, op = op.as_str(), "args");

    let config = util::poll::block_on(aws_config::load_from_env());
    let client = aws_sdk_s3::Client::new(&config);

    let mut mgr = if matches.get_flag("root") {
        manager::StorageManager::new_root(Box::new(client), bucket)
    } else {
        manager::StorageManager::new(Box::new(client), bucket)
    };
    if let Some(secs) = matches.get_one::<u64>("url-ttl") {
        mgr = mgr.with_url_ttl(Duration::from_secs(*secs));
    }
    info!(bucket = mgr.bucket(), root = mgr.is_root_bucket(), "manager ready");

    if let Err(err) = run(&mgr, op, &args) {
        error!(error = %err, op = op.as_str(), "operation failed");
        std::process::exit(if err.is_not_found() { 2 } else { 1 });
    }
}

fn run(
    mgr: &manager::StorageManager,
    op: &str,
    args: &[String],
) -> Result<(), model::storage::StorageError> {
    match op {
        "buckets" => {
            for bucket in mgr.find_buckets()? {
                match bucket.created {
                    Some(created) => println!("{}\t{:?}", bucket.name, created),
                    None => println!("{}", bucket.name),
                }
            }
        }
        "create-bucket" => {
            let bucket = mgr.create_bucket()?;
            println!("created {}", bucket.name);
        }
        "delete-bucket" => {
            if mgr.delete_bucket()? {
                println!("deleted {}", mgr.bucket());
            } else {
                println!("no such bucket: {}", mgr.bucket());
            }
        }
        "ls" => {
            let prefix = args.first().map(String::as_str).unwrap_or("");
            for object in mgr.find_entity_by_prefix_key(prefix)? {
                println!("{}\t{}", object.size, object.key);
            }
        }
        "put" => {
            let (key, file) = two_args(op, args)?;
            mgr.upload_entity_from_file(key, Path::new(file))?;
        }
        "get" => {
            let (key, file) = two_args(op, args)?;
            if !mgr.download_entity_to_file(key, Path::new(file))? {
                return Err(model::storage::StorageError::NotFound(format!(
                    "key: {}",
                    key
                )));
            }
        }
        "cat" => {
            let key = one_arg(op, args)?;
            let mut reader = mgr.download_entity(key)?;
            std::io::copy(&mut reader, &mut std::io::stdout())?;
        }
        "rm" => {
            mgr.delete_entity(one_arg(op, args)?)?;
        }
        "purge" => {
            mgr.delete_entities()?;
        }
        "publish" => {
            mgr.public_entity(one_arg(op, args)?)?;
        }
        "public" => {
            println!("{}", mgr.is_public_entity(one_arg(op, args)?)?);
        }
        "url" => {
            println!("{}", mgr.get_resource_url(one_arg(op, args)?)?);
        }
        "stat" => {
            let object = mgr.find_entity_by_unique_key(one_arg(op, args)?)?;
            println!(
                "{}\t{}\t{:?}",
                object.summary.key, object.summary.size, object.summary.modified_time
            );
        }
        "cp" => {
            let (key, target_bucket, target_key) = three_args(op, args)?;
            mgr.copy_entity(key, target_bucket, target_key)?;
        }
        _ => {
            return Err(model::storage::StorageError::Validation(format!(
                "unknown operation: {}",
                op
            )));
        }
    }

    Ok(())
}

fn one_arg<'a>(op: &str, args: &'a [String]) -> Result<&'a str, model::storage::StorageError> {
    args.first().map(String::as_str).ok_or_else(|| {
        model::storage::StorageError::Validation(format!("{} requires KEY", op))
    })
}

fn two_args<'a>(
    op: &str,
    args: &'a [String],
) -> Result<(&'a str, &'a str), model::storage::StorageError> {
    match args {
        [a, b] => Ok((a.as_str(), b.as_str())),
        _ => Err(model::storage::StorageError::Validation(format!(
            "{} requires KEY and FILE",
            op
        ))),
    }
}

fn three_args<'a>(
    op: &str,
    args: &'a [String],
) -> Result<(&'a str, &'a str, &'a str), model::storage::StorageError> {
    match args {
        [a, b, c] => Ok((a.as_str(), b.as_str(), c.as_str())),
        _ => Err(model::storage::StorageError::Validation(format!(
            "{} requires KEY, TARGET_BUCKET and TARGET_KEY",
            op
        ))),
    }
}
