use anyhow::Context;

fn main() -> anyhow::Result<()> {
    snapstamp::run().context("snapstamp failed to start")
}
