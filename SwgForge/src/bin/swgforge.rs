fn main() -> anyhow::Result<()> {
    swgforge::cli::run_cli()
}
