use std::path::PathBuf;
use std::process::ExitCode;

use rusty_canvas::format;
use rusty_canvas::utils::exporter::{export_document, ExportFormat};

struct Args {
    input: PathBuf,
    output: PathBuf,
    format: Option<ExportFormat>,
}

fn usage() -> &'static str {
    "usage: rusty-canvas <input.cmc> <output.png|jpg|tiff> [--format png|jpeg|tiff]"
}

fn parse_args() -> Option<Args> {
    let mut positional = Vec::new();
    let mut format = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--format" => {
                let next = args.next()?;
                format = Some(ExportFormat::from_path(&PathBuf::from(format!("x.{next}")))?);
            }
            "-h" | "--help" => return None,
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let mut positional = positional.into_iter();
    let input = positional.next()?;
    let output = positional.next()?;
    if positional.next().is_some() {
        return None;
    }
    Some(Args {
        input,
        output,
        format,
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(args) = parse_args() else {
        eprintln!("{}", usage());
        return ExitCode::from(2);
    };
    let Some(export_format) = args.format.or_else(|| ExportFormat::from_path(&args.output)) else {
        eprintln!("cannot tell the image format of {}", args.output.display());
        eprintln!("{}", usage());
        return ExitCode::from(2);
    };

    let doc = match format::load(&args.input) {
        Ok(doc) => doc,
        Err(err) => {
            log::error!("failed to load {}: {}", args.input.display(), err);
            return ExitCode::FAILURE;
        }
    };
    let (w, h) = doc.canvas_size();
    log::info!(
        "flattening {} ({}x{}, {} layers) to {}",
        args.input.display(),
        w,
        h,
        doc.layers().count(),
        export_format.label()
    );

    if let Err(err) = export_document(&doc, &args.output, export_format) {
        log::error!("failed to write {}: {}", args.output.display(), err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
