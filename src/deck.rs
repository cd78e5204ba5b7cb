//! Anki deck export.
//!
//! An `.apkg` file is a zip holding `collection.anki2` (an SQLite collection, schema 11)
//! and a `media` manifest. We build the collection in a temp dir, then zip it in memory.
//! Each flashcard becomes one Basic note with one new card, in input order.

use std::io::{Cursor, Write};

use rusqlite::{params, Connection};
use serde_json::{json, Value};
use sha1::{Digest, Sha1};
use tracing::{info, instrument};
use uuid::Uuid;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::domain::Flashcard;
use crate::error::DeckError;

pub const DECK_FILE_NAME: &str = "learnflow-deck.apkg";

const COLLECTION_ENTRY: &str = "collection.anki2";
const MEDIA_ENTRY: &str = "media";

// Stable ids so re-imports land in the same deck and note type.
const DECK_ID: i64 = 1_733_100_000_001;
const MODEL_ID: i64 = 1_733_100_000_002;
const DEFAULT_DECK_ID: i64 = 1;
const DEFAULT_CONF_ID: i64 = 1;

const FIELD_SEPARATOR: char = '\x1f';

const SCHEMA: &str = r#"
CREATE TABLE col (
  id integer primary key, crt integer not null, mod integer not null, scm integer not null,
  ver integer not null, dty integer not null, usn integer not null, ls integer not null,
  conf text not null, models text not null, decks text not null, dconf text not null, tags text not null
);
CREATE TABLE notes (
  id integer primary key, guid text not null, mid integer not null, mod integer not null,
  usn integer not null, tags text not null, flds text not null, sfld integer not null,
  csum integer not null, flags integer not null, data text not null
);
CREATE TABLE cards (
  id integer primary key, nid integer not null, did integer not null, ord integer not null,
  mod integer not null, usn integer not null, type integer not null, queue integer not null,
  due integer not null, ivl integer not null, factor integer not null, reps integer not null,
  lapses integer not null, left integer not null, odue integer not null, odid integer not null,
  flags integer not null, data text not null
);
CREATE TABLE revlog (
  id integer primary key, cid integer not null, usn integer not null, ease integer not null,
  ivl integer not null, lastIvl integer not null, factor integer not null, time integer not null,
  type integer not null
);
CREATE TABLE graves (usn integer not null, oid integer not null, type integer not null);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
"#;

const CARD_CSS: &str = ".card {\n font-family: arial;\n font-size: 20px;\n text-align: center;\n color: black;\n background-color: white;\n}\n";

/// Package `cards` into an `.apkg` archive. Blocking; run it off the async workers.
#[instrument(level = "info", skip(cards), fields(%deck_name, cards = cards.len()))]
pub fn build_apkg(deck_name: &str, cards: &[Flashcard]) -> Result<Vec<u8>, DeckError> {
  let dir = tempfile::tempdir()?;
  let db_path = dir.path().join(COLLECTION_ENTRY);

  {
    let mut conn = Connection::open(&db_path)?;
    write_collection(&mut conn, deck_name, cards)?;
    conn.close().map_err(|(_, e)| e)?;
  }
  let collection = std::fs::read(&db_path)?;

  let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
  let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
  zip.start_file(COLLECTION_ENTRY, options)?;
  zip.write_all(&collection)?;
  zip.start_file(MEDIA_ENTRY, options)?;
  zip.write_all(b"{}")?;
  let bytes = zip.finish()?.into_inner();

  info!(target: "study_plan", bytes = bytes.len(), "Deck packaged");
  Ok(bytes)
}

fn write_collection(conn: &mut Connection, deck_name: &str, cards: &[Flashcard]) -> Result<(), DeckError> {
  let now = chrono::Utc::now();
  let now_s = now.timestamp();
  let now_ms = now.timestamp_millis();

  conn.execute_batch(SCHEMA)?;

  let tx = conn.transaction()?;
  tx.execute(
    "INSERT INTO col VALUES (1, ?1, ?2, ?3, 11, 0, 0, 0, ?4, ?5, ?6, ?7, '{}')",
    params![
      now_s,
      now_ms,
      now_ms,
      serde_json::to_string(&collection_conf(cards.len()))?,
      serde_json::to_string(&models_json(now_s))?,
      serde_json::to_string(&decks_json(deck_name, now_s))?,
      serde_json::to_string(&dconf_json())?,
    ],
  )?;

  {
    let mut note_stmt = tx.prepare(
      "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, '', ?5, ?6, ?7, 0, '')",
    )?;
    let mut card_stmt = tx.prepare(
      "INSERT INTO cards VALUES (?1, ?2, ?3, 0, ?4, -1, 0, 0, ?5, 0, 0, 0, 0, 0, 0, 0, 0, '')",
    )?;
    for (i, card) in cards.iter().enumerate() {
      let id = now_ms + i as i64;
      let question = html_escape::encode_text(&card.question);
      let answer = html_escape::encode_text(&card.answer);
      let fields = format!("{}{}{}", question, FIELD_SEPARATOR, answer);
      note_stmt.execute(params![
        id,
        Uuid::new_v4().simple().to_string(),
        MODEL_ID,
        now_s,
        fields,
        card.question,
        field_checksum(&card.question),
      ])?;
      card_stmt.execute(params![id, id, DECK_ID, now_s, i as i64 + 1])?;
    }
  }
  tx.commit()?;
  Ok(())
}

/// First 8 hex digits of the SHA-1 of the sort field, as Anki stores it for duplicate checks.
fn field_checksum(field: &str) -> i64 {
  let digest = Sha1::digest(field.as_bytes());
  i64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

/// `nextPos` follows the last new-card position we hand out.
fn collection_conf(card_count: usize) -> Value {
  json!({
    "activeDecks": [DEFAULT_DECK_ID],
    "curDeck": DEFAULT_DECK_ID,
    "newSpread": 0,
    "collapseTime": 1200,
    "timeLim": 0,
    "estTimes": true,
    "dueCounts": true,
    "curModel": null,
    "nextPos": card_count + 1,
    "sortType": "noteFld",
    "sortBackwards": false,
    "addToCur": true
  })
}

fn models_json(now_s: i64) -> Value {
  let field = |name: &str, ord: u32| json!({
    "name": name, "ord": ord, "sticky": false, "rtl": false,
    "font": "Arial", "size": 20, "media": []
  });
  json!({
    MODEL_ID.to_string(): {
      "id": MODEL_ID,
      "name": "LearnFlow Basic",
      "type": 0,
      "mod": now_s,
      "usn": -1,
      "sortf": 0,
      "did": DECK_ID,
      "tmpls": [{
        "name": "Card 1",
        "ord": 0,
        "qfmt": "{{Question}}",
        "afmt": "{{FrontSide}}\n\n<hr id=answer>\n\n{{Answer}}",
        "did": null,
        "bqfmt": "",
        "bafmt": ""
      }],
      "flds": [field("Question", 0), field("Answer", 1)],
      "css": CARD_CSS,
      "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
      "latexPost": "\\end{document}",
      "tags": [],
      "vers": [],
      "req": [[0, "all", [0]]]
    }
  })
}

fn deck_entry(id: i64, name: &str, now_s: i64) -> Value {
  json!({
    "id": id,
    "name": name,
    "desc": "",
    "mod": now_s,
    "usn": -1,
    "collapsed": false,
    "browserCollapsed": false,
    "newToday": [0, 0],
    "revToday": [0, 0],
    "lrnToday": [0, 0],
    "timeToday": [0, 0],
    "dyn": 0,
    "extendNew": 10,
    "extendRev": 50,
    "conf": DEFAULT_CONF_ID
  })
}

fn decks_json(deck_name: &str, now_s: i64) -> Value {
  json!({
    DEFAULT_DECK_ID.to_string(): deck_entry(DEFAULT_DECK_ID, "Default", now_s),
    DECK_ID.to_string(): deck_entry(DECK_ID, deck_name, now_s),
  })
}

fn dconf_json() -> Value {
  json!({
    DEFAULT_CONF_ID.to_string(): {
      "id": DEFAULT_CONF_ID,
      "name": "Default",
      "mod": 0,
      "usn": 0,
      "maxTaken": 60,
      "autoplay": true,
      "timer": 0,
      "replayq": true,
      "dyn": false,
      "new": {
        "delays": [1, 10],
        "ints": [1, 4, 7],
        "initialFactor": 2500,
        "order": 1,
        "perDay": 20,
        "bury": true,
        "separate": true
      },
      "rev": {
        "perDay": 100,
        "ease4": 1.3,
        "fuzz": 0.05,
        "ivlFct": 1,
        "maxIvl": 36500,
        "minSpace": 1,
        "bury": true
      },
      "lapse": {
        "delays": [10],
        "mult": 0,
        "minInt": 1,
        "leechFails": 8,
        "leechAction": 0
      }
    }
  })
}
