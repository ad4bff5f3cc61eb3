//! Compact result payload used for history entries and share links.
//!
//! Keys are deliberately short so an encoded result stays small. The
//! URL-safe transport wrapper is left to whoever publishes the link.

use serde::{Deserialize, Serialize};

use crate::prompts::Prompt;
use crate::score::{Difficulty, ScoreOutput};
use crate::stats::RunStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompactPrompt {
    id: String,
    l: String,
    d: Difficulty,
    n: u8,
    c: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompactStats {
    w: f64,
    a: f64,
    t: u64,
    sc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompactExtras {
    rw: f64,
    m: usize,
    b: usize,
    cn: Option<u32>,
    fk: Option<u64>,
    cc: usize,
    tc: usize,
    tt: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pk: Vec<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cl: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ResultPayload {
    p: CompactPrompt,
    s: CompactStats,
    r: CompactExtras,
}

/// What a decoded payload yields back.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResult {
    pub prompt: Prompt,
    pub stats: RunStats,
    pub score: ScoreOutput,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn encode_result(prompt: &Prompt, stats: &RunStats, score: Option<&ScoreOutput>) -> String {
    let payload = ResultPayload {
        p: CompactPrompt {
            id: prompt.id.clone(),
            l: prompt.language.clone(),
            d: prompt.difficulty,
            n: prompt.lines,
            c: prompt.code.clone(),
        },
        s: CompactStats {
            w: round_to(stats.correct_wpm, 1),
            a: round_to(stats.accuracy, 3),
            t: stats.duration_ms,
            sc: score.map_or(0.0, |s| s.score),
        },
        r: CompactExtras {
            rw: round_to(stats.raw_wpm, 1),
            m: stats.mistakes,
            b: stats.backspaces,
            cn: stats.consistency,
            fk: stats.time_to_first_key_ms,
            cc: stats.correct_chars,
            tc: stats.target_chars,
            tt: stats.total_typed_chars,
            pk: stats.problem_keys.clone(),
            lp: stats.longest_pause_ms,
            cl: stats.avg_correction_latency_ms.map(|l| l.round() as u64),
        },
    };

    // a struct of plain fields always serializes
    serde_json::to_string(&payload).unwrap_or_default()
}

pub fn decode_result(encoded: &str) -> Option<DecodedResult> {
    let payload: ResultPayload = serde_json::from_str(encoded).ok()?;

    let prompt = Prompt {
        id: payload.p.id,
        language: payload.p.l,
        code: payload.p.c,
        difficulty: payload.p.d,
        lines: payload.p.n,
    };

    let stats = RunStats {
        duration_ms: payload.s.t,
        time_to_first_key_ms: payload.r.fk,
        target_chars: payload.r.tc,
        correct_chars: payload.r.cc,
        total_typed_chars: payload.r.tt,
        mistakes: payload.r.m,
        backspaces: payload.r.b,
        raw_wpm: payload.r.rw,
        correct_wpm: payload.s.w,
        accuracy: payload.s.a,
        consistency: payload.r.cn,
        problem_keys: payload.r.pk,
        longest_pause_ms: payload.r.lp,
        avg_correction_latency_ms: payload.r.cl.map(|l| l as f64),
    };

    let score = ScoreOutput {
        cwpm: payload.s.w,
        accuracy: payload.s.a,
        score: payload.s.sc,
    };

    Some(DecodedResult {
        prompt,
        stats,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Prompt, RunStats) {
        let prompt = Prompt {
            id: "00".into(),
            language: "ts".into(),
            code: "function noop() {}".into(),
            difficulty: Difficulty::Easy,
            lines: 1,
        };
        let stats = RunStats {
            duration_ms: 2_000,
            time_to_first_key_ms: Some(340),
            target_chars: 18,
            correct_chars: 18,
            total_typed_chars: 20,
            mistakes: 2,
            backspaces: 0,
            raw_wpm: 120.04,
            correct_wpm: 108.06,
            accuracy: 0.9,
            consistency: Some(71),
            problem_keys: vec!['o', '{'],
            longest_pause_ms: Some(410),
            avg_correction_latency_ms: Some(212.6),
        };
        (prompt, stats)
    }

    #[test]
    fn encoded_payload_uses_short_keys_and_rounding() {
        let (prompt, stats) = sample();
        let encoded = encode_result(&prompt, &stats, None);
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["s"]["w"], 108.1);
        assert_eq!(value["s"]["sc"], 0.0);
        assert_eq!(value["r"]["rw"], 120.0);
        assert_eq!(value["r"]["cl"], 213);
        assert_eq!(value["p"]["d"], "easy");
    }

    #[test]
    fn optional_extras_are_omitted_when_absent() {
        let (prompt, mut stats) = sample();
        stats.problem_keys.clear();
        stats.longest_pause_ms = None;
        stats.avg_correction_latency_ms = None;

        let encoded = encode_result(&prompt, &stats, None);
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert!(value["r"].get("pk").is_none());
        assert!(value["r"].get("lp").is_none());
        assert!(value["r"].get("cl").is_none());

        let decoded = decode_result(&encoded).unwrap();
        assert!(decoded.stats.problem_keys.is_empty());
        assert_eq!(decoded.stats.longest_pause_ms, None);
    }

    #[test]
    fn decode_restores_score_and_prompt() {
        let (prompt, stats) = sample();
        let score = ScoreOutput {
            cwpm: 108.0,
            accuracy: 0.9,
            score: 101.5,
        };
        let decoded = decode_result(&encode_result(&prompt, &stats, Some(&score))).unwrap();

        assert_eq!(decoded.prompt, prompt);
        assert_eq!(decoded.score.score, 101.5);
        assert_eq!(decoded.stats.problem_keys, vec!['o', '{']);
        assert_eq!(decoded.stats.consistency, Some(71));
    }

    #[test]
    fn malformed_input_decodes_to_none() {
        assert_eq!(decode_result("not json"), None);
        assert_eq!(decode_result("{\"p\":{}}"), None);
    }
}
