use clap::Parser;
use devrank::api::Sort;
use secrecy::SecretString;
use std::path::PathBuf;
use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Region used to seed the user search, e.g. "wroclaw" or "poland"
    #[clap(short, long, env)]
    pub region: String,

    /// Number of users to discover and score
    #[clap(short, long, env, default_value_t = 25, parse(try_from_str=user_count_in_range))]
    pub user_count: u32,

    /// User search order: followers, repositories or joined
    #[clap(short, long, env, default_value = "followers")]
    pub sort: Sort,

    /// API OAuth access token
    #[clap(short, long, env)]
    pub api_token: Option<SecretString>,

    /// Repository API URL
    #[clap(long, env, default_value = "https://api.github.com")]
    pub api_url: String,

    /// Directory for the response cache and the per-run user snapshot
    #[clap(long, env, default_value = ".devrank-cache")]
    pub cache_dir: PathBuf,
}

fn user_count_in_range(value: &str) -> clap::Result<u32, String> {
    // Search results past the first thousand are unreachable upstream.
    number_in_range(value, 1, 1000, "user_count".to_string())
}

fn number_in_range<T>(value: &str, min: T, max: T, name: String) -> clap::Result<T, String>
where
    T: FromStr + PartialOrd + Display,
    <T as FromStr>::Err: Display,
{
    value.parse::<T>().map_err(|err| format!("{}", err)).and_then(|value| {
        if value < min || value > max {
            return Err(format!("{} is not in range {} .. {}.", name, min, max));
        }
        Ok(value)
    })
}
