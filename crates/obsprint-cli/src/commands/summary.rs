use crate::support;

pub fn run(data: String, json: bool) {
    let dataset = support::load_dataset_or_exit(&data);
    let summary = dataset.summary();

    if json {
        let rendered = serde_json::to_string_pretty(&summary).unwrap_or_else(|e| {
            eprintln!("error: failed to render summary: {e}");
            std::process::exit(1);
        });
        println!("{rendered}");
    } else {
        print!("{summary}");
    }
}
