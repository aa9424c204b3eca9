fn main() -> anyhow::Result<()> {
    routeward::cli::run_cli()
}
