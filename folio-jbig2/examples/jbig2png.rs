//! This example shows you how to convert the first page of a JBIG2 file into a
//! PNG file.

#![allow(missing_docs)]

use std::process::ExitCode;

use folio_jbig2::{DecodeSettings, decode_file};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <input.jbig2> <output.png>", args[0]);

        return ExitCode::FAILURE;
    }

    let input_path = &args[1];
    let output_path = &args[2];

    let data = match std::fs::read(input_path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Failed to read input file: {err}");

            return ExitCode::FAILURE;
        }
    };

    let pages = match decode_file(&data, &DecodeSettings::default()) {
        Ok(pages) => pages,
        Err(err) => {
            eprintln!("Failed to decode JBIG2: {err}");

            return ExitCode::FAILURE;
        }
    };

    let Some(page) = pages.first() else {
        eprintln!("The file has no pages");

        return ExitCode::FAILURE;
    };

    println!(
        "Decoded: {} page(s), first page {}x{}",
        pages.len(),
        page.width(),
        page.height()
    );

    if let Err(err) = page.bitmap.to_luma_image().save(output_path) {
        eprintln!("Failed to save PNG: {err}");

        return ExitCode::FAILURE;
    }

    eprintln!("Saved: {output_path}");

    ExitCode::SUCCESS
}
