use anyhow::Result;
use std::io::Write;

use crate::application::LedgerService;

/// Exporter for writing joined transfer views in various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export joined transfers to CSV format, headers matching the JSON field names.
    pub async fn export_transfers_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transfers = self.service.list_transfers().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        for view in &transfers {
            csv_writer.serialize(view)?;
        }

        csv_writer.flush()?;
        Ok(transfers.len())
    }

    /// Export joined transfers as a pretty-printed JSON array
    pub async fn export_transfers_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let transfers = self.service.list_transfers().await?;

        let json = serde_json::to_string_pretty(&transfers)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(transfers.len())
    }
}
