use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunSummary};
use crate::domain::EnrichmentRecord;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// Prints progress lines for someone watching the run.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        println!("{}", format_event(&event));
    }
}

/// Progress line, prefixed with the run's elapsed time when known.
pub fn format_event(event: &ProgressEvent) -> String {
    match event.elapsed {
        Some(elapsed) => format!("[{:>5}s] {}", elapsed.as_secs(), event.message),
        None => event.message.clone(),
    }
}

impl ConsoleOutput {
    pub fn print_summary(summary: &RunSummary) {
        println!(
            "processed {} identifiers: {} stored, {} failed, {} pauses",
            summary.total, summary.stored, summary.failed, summary.pauses
        );
    }

    pub fn print_record(record: &EnrichmentRecord) {
        println!("cnpj:               {}", record.cnpj);
        println!("inscricao estadual: {}", record.state_registration);
        println!("razao social:       {}", record.legal_name);
        println!("nome:               {}", record.alternate_name);
        println!("nome fantasia:      {}", record.trade_name);
        println!("logradouro:         {}", record.street);
        println!("cep:                {}", record.postal_code);
        println!("uf:                 {}", record.state);
    }

    pub fn print_records(records: &[EnrichmentRecord]) {
        for record in records {
            println!(
                "{}\t{}\t{}\t{}",
                record.cnpj, record.legal_name, record.trade_name, record.state
            );
        }
        println!("{} records", records.len());
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_record(record: &EnrichmentRecord) -> io::Result<()> {
        Self::print_json(record)
    }

    pub fn print_records(records: &[EnrichmentRecord]) -> io::Result<()> {
        Self::print_json(&records)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
