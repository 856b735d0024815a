use clap::Parser;
use devrank::api::Error;
use devrank_app::Args;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let report = devrank_app::rank_region(args).await?;

    println!("Ranked developers:");
    for (position, user) in report.users.iter().enumerate() {
        println!(
            "{}.\t{}\tscore: {:.1}\tfollowers: {}\trepos: {}",
            position + 1,
            user.login,
            user.score,
            user.followers,
            user.public_repos
        );
    }

    println!("\nRegion projects:");
    for (position, project) in report.projects.iter().enumerate() {
        println!(
            "{}.\t{}\tstars: {}\tforks: {}\tcontributors here: {}",
            position + 1,
            project.full_name,
            project.stars,
            project.forks,
            project.region_contributors.len()
        );
    }

    Ok(())
}
