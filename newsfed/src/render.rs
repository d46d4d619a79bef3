use crate::aggregator::{AgencyFailure, QueryOutcome};
use crate::models::{Agency, Story};

const RULE_WIDTH: usize = 30;

pub fn story(story: &Story) -> String {
    format!(
        "Key: {}\nHeadline: {}\nCategory: {}\nRegion: {}\nAuthor: {}\nDate: {}\nDetails: {}\nAgency: {}\n{}",
        story.key,
        story.headline,
        story.category.label(),
        story.region.label(),
        story.author,
        story.date.format("%d/%m/%Y"),
        story.details,
        story.agency_code,
        "-".repeat(RULE_WIDTH)
    )
}

pub fn agency(agency: &Agency) -> String {
    format!(
        "Agency Name: {}\nURL: {}\nAgency Code: {}\n",
        agency.name, agency.base_url, agency.code
    )
}

pub fn failure(failure: &AgencyFailure) -> String {
    format!(
        "Failed to fetch stories from {} ({}): {}",
        failure.agency.code, failure.agency.base_url, failure.error
    )
}

/// Full `news` output: stories, then one note per failed agency, then a summary line.
pub fn outcome(outcome: &QueryOutcome) -> String {
    let mut out: Vec<String> = outcome.stories.iter().map(story).collect();
    out.extend(outcome.failures.iter().map(failure));
    out.push(format!(
        "{} stories from {} of {} agencies",
        outcome.stories.len(),
        outcome.agencies_queried.saturating_sub(outcome.failures.len()),
        outcome.agencies_queried
    ));
    out.join("\n")
}
