//! Offline match scoring.

use clap::Args;

use crate::matching::{MATCH_THRESHOLD, score_breakdown};
use crate::model::{CandidateSource, CandidateTrack, SourceTrack};

#[derive(Args)]
pub struct ScoreArgs {
    /// Catalog track title
    #[arg(long)]
    pub title: String,
    /// Catalog artist; repeat for multiple credits
    #[arg(long = "artist", required = true)]
    pub artists: Vec<String>,
    /// Catalog duration in milliseconds (0 = unknown)
    #[arg(long, default_value = "0")]
    pub duration_ms: u64,
    /// Library candidate title
    #[arg(long)]
    pub candidate_title: String,
    /// Library candidate artist
    #[arg(long)]
    pub candidate_artist: String,
    /// Library candidate duration in milliseconds
    #[arg(long)]
    pub candidate_duration_ms: Option<u64>,
}

/// Print every sub-score for one track pair
pub fn cmd_score(args: &ScoreArgs) -> anyhow::Result<()> {
    let source = SourceTrack {
        id: "cli".to_string(),
        title: args.title.clone(),
        artists: args.artists.clone(),
        album: String::new(),
        duration_ms: args.duration_ms,
    };
    let candidate = CandidateTrack {
        id: "cli".to_string(),
        title: args.candidate_title.clone(),
        artist: args.candidate_artist.clone(),
        album: String::new(),
        duration_ms: args.candidate_duration_ms,
        source: CandidateSource::Library,
    };

    let breakdown = score_breakdown(&source, &candidate);

    println!("Source:     {}", source.display_name());
    println!("Candidate:  {} - {}", candidate.artist, candidate.title);
    println!();
    println!("Title:      {:.3}", breakdown.title);
    println!("Artist:     {:.3}", breakdown.artist);
    println!("Duration:   {:.3}", breakdown.duration);
    println!("Confidence: {:.3}", breakdown.confidence);
    println!("Tier:       {}", breakdown.tier);
    println!(
        "Match:      {}",
        if breakdown.confidence >= MATCH_THRESHOLD { "yes" } else { "no" }
    );
    Ok(())
}
