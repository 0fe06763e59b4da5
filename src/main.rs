fn main() -> anyhow::Result<()> {
    richnotes::cli::run()
}
