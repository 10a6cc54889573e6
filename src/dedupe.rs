use crate::extractor::ExtractionRecord;
use std::collections::HashSet;

/// Reduce extraction records to unique URLs, keeping the order in which each URL first appeared
pub fn unique_urls<I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = ExtractionRecord>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut urls = Vec::new();

    for record in records {
        if seen.insert(record.url.clone()) {
            urls.push(record.url);
        }
    }

    urls
}
