fn main() -> anyhow::Result<()> {
    sweepbench_cli::run()
}
