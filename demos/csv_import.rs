use financial_data_pipeline::{FinancialDataPipeline, PipelineConfig};

const UPLOAD: &str = "\
type,id,amount,date,customer,vendor,status
invoice,INV-1001,4200.00,2024-03-01,Globex,,pending
invoice,INV-1002,1850,2024/03/08,Initech,,paid
expense,,312.40,2024-03-04,,Paper Co,
expense,,1800000,2024-03-09,,Big Iron Ltd,
";

fn main() {
    let config = PipelineConfig {
        default_source: "csv_upload".to_string(),
        ..PipelineConfig::default()
    };
    let pipeline = FinancialDataPipeline::new(config).expect("default-derived config is valid");

    let outcome = pipeline
        .process_csv(UPLOAD)
        .expect("upload should parse and normalize");

    println!(
        "Normalized {} records from '{}' at {}",
        outcome.data.metadata.record_count,
        outcome.data.metadata.source,
        outcome.data.metadata.timestamp
    );
    for (category, total) in outcome.data.totals() {
        println!(" - {:<8} total {:>12.2}", category, total);
    }

    if outcome.is_valid() {
        println!("Structurally valid, ready for analysis.");
    } else {
        for error in &outcome.validation.errors {
            println!("error: {}", error);
        }
    }
    for warning in outcome.warnings() {
        println!("warning: {}", warning);
    }

    println!(
        "{}",
        outcome
            .data
            .to_json()
            .expect("canonical data serializes")
    );
}
