//! CSV export for a named collection of finished parameter traces.
//!
//! This is the crate-level counterpart to `MhSampler`/`HmcSampler::export_trace`
//! (factored out so a caller holding several finished samplers can combine
//! or re-export their traces without depending on the sampler crates
//! directly), implementing the same persisted format as §6: header
//! `iteration,<param>,...,log_prob,accepted`.

use std::io::Write;

use indexmap::IndexMap;
use sever_core::errors::ErrorInfo;
use sever_core::SeverError;
use sever_mcmc::ParameterTrace;

/// Writes `traces` to `writer` as CSV.
///
/// Rows are aligned to the first trace's length; per spec §4.H "rows
/// aligned to the first parameter's trace length (all traces share length
/// by construction)", every trace is expected to have equal length.
pub fn export_trace_csv<W: Write>(
    traces: &IndexMap<String, ParameterTrace>,
    writer: W,
) -> Result<(), SeverError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let names: Vec<&String> = traces.keys().collect();

    let mut header = vec!["iteration".to_string()];
    header.extend(names.iter().map(|n| n.to_string()));
    header.push("log_prob".to_string());
    header.push("accepted".to_string());
    wtr.write_record(&header)
        .map_err(|e| io_error(e.to_string()))?;

    let len = names
        .first()
        .and_then(|n| traces.get(*n))
        .map(ParameterTrace::len)
        .unwrap_or(0);

    for i in 0..len {
        let mut row = vec![i.to_string()];
        let mut log_prob = 0.0;
        let mut accepted = false;
        for name in &names {
            let entry = traces[*name].entries()[i];
            row.push(entry.value.to_string());
            log_prob = entry.log_prob;
            accepted = entry.accepted;
        }
        row.push(log_prob.to_string());
        row.push(accepted.to_string());
        wtr.write_record(&row).map_err(|e| io_error(e.to_string()))?;
    }
    wtr.flush().map_err(|e| io_error(e.to_string()))?;
    Ok(())
}

fn io_error(message: impl Into<String>) -> SeverError {
    SeverError::IoError(ErrorInfo::new("DG010", message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_matches_persisted_format() {
        let mut traces = IndexMap::new();
        let mut x = ParameterTrace::new();
        x.push(1.0, true, -0.5);
        x.push(2.0, false, -0.7);
        let mut y = ParameterTrace::new();
        y.push(0.1, true, -0.5);
        y.push(0.2, false, -0.7);
        traces.insert("x".to_string(), x);
        traces.insert("y".to_string(), y);

        let mut buf = Vec::new();
        export_trace_csv(&traces, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "iteration,x,y,log_prob,accepted");
        assert_eq!(lines.next().unwrap(), "0,1,0.1,-0.5,true");
        assert_eq!(lines.next().unwrap(), "1,2,0.2,-0.7,false");
    }

    #[test]
    fn empty_trace_map_emits_header_only() {
        let traces: IndexMap<String, ParameterTrace> = IndexMap::new();
        let mut buf = Vec::new();
        export_trace_csv(&traces, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
