use clap::ValueEnum;
use serde_json::Value;
use tabled::Table;

use crate::{
    config::Config,
    error,
    management::LibraryManager,
    types::{ArtistTableRow, PlaylistTableRow, TrackTableRow},
    utils::item_id,
    warning,
};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LibrarySection {
    Likes,
    Playlists,
    History,
    Artists,
}

pub async fn library(config: Config, section: LibrarySection) {
    let manager = LibraryManager::new(config.library_path);
    let data = match manager.load().await {
        Ok(data) => data,
        Err(e) => error!(
            "Cannot read library at {}. Err: {}",
            manager.path().display(),
            e
        ),
    };

    let table = match section {
        LibrarySection::Likes => track_table(&data.likes),
        LibrarySection::History => {
            let recent: Vec<Value> = data.history.into_iter().rev().collect();
            track_table(&recent)
        }
        LibrarySection::Artists => {
            let rows: Vec<ArtistTableRow> = data
                .artists
                .iter()
                .map(|a| ArtistTableRow {
                    id: item_id(a).unwrap_or_default(),
                    name: text(a, "name"),
                })
                .collect();
            empty_or(rows.len(), Table::new(rows))
        }
        LibrarySection::Playlists => {
            let rows: Vec<PlaylistTableRow> = data
                .playlists
                .into_iter()
                .map(|p| PlaylistTableRow {
                    id: p.id,
                    name: p.name,
                    tracks: p.tracks.len(),
                    created: p.created_at,
                })
                .collect();
            empty_or(rows.len(), Table::new(rows))
        }
    };

    match table {
        Some(table) => println!("{}", table),
        None => warning!("Nothing in {:?} yet", section),
    }
}

fn track_table(tracks: &[Value]) -> Option<Table> {
    let rows: Vec<TrackTableRow> = tracks
        .iter()
        .map(|t| TrackTableRow {
            id: item_id(t).unwrap_or_default(),
            name: t
                .get("title")
                .or_else(|| t.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            artist: t
                .pointer("/artist/name")
                .or_else(|| t.pointer("/artists/0/name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect();
    empty_or(rows.len(), Table::new(rows))
}

fn text(item: &Value, field: &str) -> String {
    item.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn empty_or(len: usize, table: Table) -> Option<Table> {
    (len > 0).then_some(table)
}
