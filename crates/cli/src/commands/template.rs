use std::{fs::File, io, path::Path};

use importer::{TEMPLATE_FILE_NAME, write_template};

use crate::error::Result;

pub fn write(output: Option<&Path>) -> Result<()> {
    let path = output.unwrap_or(Path::new(TEMPLATE_FILE_NAME));
    if path == Path::new("-") {
        write_template(io::stdout().lock())?;
        return Ok(());
    }
    write_template(File::create(path)?)?;
    println!("Template written to {}", path.display());
    Ok(())
}
