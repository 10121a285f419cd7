use clap::{Parser, Subcommand};

use loadreport::{Result, render, run, table};

#[derive(Parser)]
#[command(name = "loadreport-viz")]
#[command(about = "Load-test report viewer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an interactive report (validates the run while loading).
    Report {
        #[arg(long)]
        run: String,

        #[arg(short = 'o', long)]
        out: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Report { run, out } => {
            // 1) Parse + validate run.json (skips invalid records, rejects
            //    duplicate ids).
            let validated = run::load_run_file(&run)?;

            // 2) Build the table session with its default view.
            let mut table = table::RequestsTable::new(validated);

            // 3) Render HTML.
            let html = render::render_html_report(&mut table)?;
            std::fs::write(&out, html)?;
            println!("Wrote {}", out);
        }
    }

    Ok(())
}
