use std::io::Write;
use tempfile::NamedTempFile;

/// Writes a `phone,amount,description` CSV with the given rows.
pub fn payments_csv(rows: &[(&str, &str, &str)]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    {
        let mut wtr = csv::Writer::from_writer(file.as_file_mut());
        wtr.write_record(["phone", "amount", "description"]).unwrap();
        for (phone, amount, description) in rows {
            wtr.write_record([phone, amount, description]).unwrap();
        }
        wtr.flush().unwrap();
    }
    file.flush().unwrap();
    file
}

/// Fast polling flags so simulated flows finish in milliseconds.
pub const FAST_POLLING: [&str; 4] = ["--poll-interval-ms", "5", "--max-attempts", "3"];
