use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::uff::{write_uff_file, UffHeader};

use super::AfmFile;

impl AfmFile {
    /// Name of the UFF file curve `index` is exported to
    pub fn uff_file_name(&self, index: usize) -> String {
        if self.metadata.force_volume {
            format!("{}_{}.uff", self.metadata.file_id, index)
        } else {
            format!("{}.uff", self.metadata.file_id)
        }
    }

    /// Export curves to UFF files in `dir`.
    ///
    /// Force-volume files produce one `<id>_<index>.uff` per curve, other
    /// files a single `<id>.uff`. Returns the written paths.
    pub fn write_uff<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let count = if self.metadata.force_volume {
            self.curve_count()
        } else {
            self.curve_count().min(1)
        };

        let mut written = Vec::with_capacity(count);
        for index in 0..count {
            let curve = self.get_curve(index)?;
            let header = UffHeader::from_metadata(&self.metadata, &self.config, &curve);
            let path = dir.join(self.uff_file_name(index));
            write_uff_file(&path, &header, &curve)?;
            written.push(path);
        }

        log::info!("Exported {} curves to {}", written.len(), dir.display());
        Ok(written)
    }
}
