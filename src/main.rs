use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    rootsat::command_line::cli::main()
}
