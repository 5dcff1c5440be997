//! Example: Faculty dashboard
//!
//! This example seeds an in-memory governor with a few proposals and votes,
//! then prints the dashboard buckets and per-proposal summaries the way the
//! front-end would render them.

use alloy_primitives::U256;
use chrono::Utc;
use evsd_client::{
    AnnouncementRecord, ClientConfig, EvsdClient, GovernorState, MemorySource, MemoryStore,
    ProposalCreatedEvent, ProposalMetadata, ProposalSubItem, VoteOption,
};
use std::sync::Arc;

const FACULTIES: [&str; 6] = [
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
    "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC",
    "0x90F79bf6EB2c4f870365E785982E1f101E93b906",
    "0x15d34AAf54267DB7D7c367839AAf71A00a2C6A65",
    "0x9965507D1a55bcC2695C58ba16FB37d819B0A4dc",
    "0x976EA74026E726554dB657fA54763abd0C3a0aa9",
];

fn seed() -> Result<MemorySource, Box<dyn std::error::Error>> {
    let now = Utc::now().timestamp() as u64;
    let mut source = MemorySource::new(18);
    for faculty in FACULTIES {
        source.register_voter(faculty);
    }

    let proposals = [
        (
            ProposalMetadata::new("Izmena statuta", "Usklađivanje statuta sa zakonom"),
            GovernorState::Active,
            now + 36 * 3600,
        ),
        (
            ProposalMetadata::new("Budžet 2025", "Raspodela sredstava po fakultetima")
                .with_sub_items(vec![
                    ProposalSubItem::new("1", "Oprema", "Laboratorije"),
                    ProposalSubItem::new("2", "Putovanja", "Konferencije"),
                ]),
            GovernorState::Active,
            now + 5 * 3600,
        ),
        (
            ProposalMetadata::new("Novi studijski program", "Softversko inženjerstvo"),
            GovernorState::Executed,
            now - 24 * 3600,
        ),
    ];

    for (index, (metadata, state, deadline)) in proposals.into_iter().enumerate() {
        source.create_proposal(
            ProposalCreatedEvent {
                proposal_id: U256::from(index as u64 + 1),
                proposer: FACULTIES[index].to_string(),
                vote_start: now - 3600,
                description: metadata.to_description()?,
            },
            state,
            deadline,
        );
    }

    // Four of six faculties vote on the first proposal, so it reaches quorum
    for (block, faculty) in FACULTIES.iter().take(4).enumerate() {
        source.cast_vote(*faculty, U256::from(1u64), 1, block as u64 + 100);
    }
    source.cast_vote(FACULTIES[1], U256::from(3u64), 0, 90);
    source.cast_vote(FACULTIES[2], U256::from(3u64), 1, 91);

    source.announce(AnnouncementRecord {
        content: "Sednica veća u petak u 12h".to_string(),
        announcer: FACULTIES[0].to_string(),
        timestamp: now - 600,
        is_active: true,
    });

    Ok(source)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    evsd_client::init_tracing();

    println!("=== eVSD Dashboard Example ===\n");

    let config = ClientConfig::localhost();
    println!("Network: {:?}", config.network);
    println!("RPC URL: {}\n", config.rpc_url);

    let mut client = EvsdClient::new(config, Arc::new(seed()?), MemoryStore::new())?;
    client.register_faculty_name(FACULTIES[0], "Elektrotehnički fakultet")?;
    println!("✓ Client initialized");

    client.verify_deployment().await?;
    println!("✓ Deployment verified on chain {}\n", client.config().chain_id);

    let viewer = FACULTIES[1];
    client
        .cast_vote(viewer, U256::from(2u64), VoteOption::For)
        .await?;
    println!("✓ Vote submitted on proposal #2\n");

    let snapshot = client.snapshot(viewer).await?;
    println!(
        "Viewing as {} ({} registered voters)\n",
        client.names().resolve_name(viewer),
        snapshot.registered_voter_count()
    );

    let buckets = snapshot.buckets();
    println!("Waiting for your vote:");
    for proposal in &buckets.with_quorum {
        println!("  ! {} (quorum reached)", proposal.title);
    }
    for proposal in &buckets.without_quorum {
        println!("  - {}", proposal.title);
    }
    println!("Voted and complete: {}", buckets.voted_and_complete.len());
    println!();

    for (proposal, summary) in snapshot
        .proposals
        .iter()
        .zip(snapshot.summaries(client.names()))
    {
        println!("#{} {}", proposal.id, proposal.title);
        println!("  Author: {}", summary.author_name);
        println!(
            "  Quorum: {}/{} ({:.0}%)",
            summary.quorum.total_votes, summary.quorum.quorum, summary.quorum.percentage
        );
        println!("  For: {:.1}%", summary.for_percentage);
        println!("  Remaining: {}", summary.remaining_time);
        println!("  Your vote: {}", proposal.your_vote);
        println!("  Result: {:?}", summary.result);
        for item in &summary.sub_items {
            println!("    - {}: {:?}", item.title, item.result);
        }
        println!();
    }

    for announcement in client.announcements().await? {
        println!("📢 {}", announcement.content);
    }

    let history = client.voting_history(viewer).await?;
    println!("\nYou have voted {} time(s)", history.len());

    Ok(())
}
