use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::IoError;
use crate::utils::create_directories_if_needed;

/* This trait allow us to persist data by serializing and deserializing JSON files */
pub trait Persistable: Serialize + DeserializeOwned {
    fn load(path: &Path) -> Result<Self, IoError>
    where
        Self: Sized,
    {
        let file = File::open(path)?;
        let deserialized: Self = serde_json::from_reader(BufReader::new(file))?;
        return Ok(deserialized);
    }

    fn save(&self, path: &Path) -> Result<(), IoError> {
        create_directories_if_needed(path)?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
