//! Card Template Builder
//!
//! Turns the three user fields into one self-contained HTML document. The
//! ceremonial content is fixed; only the guest, family and contact lines
//! vary. Output is a pure function of the inputs.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::fields::InvitationFields;
use crate::hashing::compute_document_digest;
use crate::preview;

/// Fixed ceremonial content printed on every card.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CeremonyDetails {
    pub title_sanskrit: &'static str,
    pub title: &'static str,
    pub occasion: &'static str,
    pub date: &'static str,
    pub time: &'static str,
    pub significance: &'static str,
    pub host: &'static str,
    pub opening_mantra: &'static str,
    pub closing_mantra: &'static str,
    pub rituals: [&'static str; 4],
    pub sanskrit_blessing: &'static str,
    pub english_blessing: &'static str,
}

pub const CEREMONY: CeremonyDetails = CeremonyDetails {
    title_sanskrit: "सत्यनारायण पूजा",
    title: "Satya Narayana Pooja",
    occasion: "Anant Chaturdashi",
    date: "Friday, 06 September 2025",
    time: "12:00 PM onwards",
    significance: "Ganesha Visarjan & Satya Narayana Pooja",
    host: "Darshan Hulamani & Family",
    opening_mantra: "ॐ गणेशाय नमः । ॐ नमो भगवते वासुदेवाय ।",
    closing_mantra: "गणपति बप्पा मोरया! । सत्यनारायण की जय!",
    rituals: [
        "🙏 Ganesha Visarjan Ceremony",
        "📿 Satya Narayana Katha & Pooja",
        "🏺 Kalash Sthapana & Worship",
        "🪔 Aarti & Prasadam Distribution",
    ],
    sanskrit_blessing: "सर्वे भवन्तु सुखिनः । सर्वे सन्तु निरामयाः ।",
    english_blessing: "(May all beings be happy and healthy)",
};

const STYLE: &str = r#"
* { box-sizing: border-box; }
body { font-family: 'Poppins', sans-serif; margin: 0; padding: 16px; background: white; color: #654321; line-height: 1.6; }
.invitation-card { background: linear-gradient(145deg, #FFFFFF 0%, #FFF8F0 100%); border: 4px solid #FFA500; border-radius: 16px; padding: 24px; margin: 0 auto; }
.decorative-border { height: 6px; background: linear-gradient(90deg, #FF9933, #FFD700, #FFA500); border-radius: 4px; margin: 20px 0; }
.symbols { display: flex; justify-content: center; gap: 16px; font-size: 2.2rem; }
.card-content { text-align: center; }
.mantra { font-size: 16px; color: #8B0000; font-weight: 600; padding: 12px; background: #FFF8DC; border-radius: 8px; border: 2px solid #FFD700; margin-bottom: 20px; }
.card-title { font-family: 'Cinzel', serif; font-size: 24px; color: #8B0000; margin-bottom: 12px; }
.card-subtitle { font-size: 20px; color: #DAA520; margin-bottom: 12px; }
.card-occasion { font-style: italic; margin-bottom: 20px; }
.guest-name-section { margin: 24px 0; padding: 20px; background: #FFF8DC; border-radius: 10px; border: 3px solid #FFD700; }
.guest-name { font-size: 20px; font-weight: 700; margin-bottom: 8px; }
.family-name { font-size: 18px; color: #8B0000; font-weight: 600; margin: 0; }
.event-details { background: #FFFACD; padding: 20px; border-radius: 10px; margin: 24px 0; border: 3px solid #FFA500; }
.detail-row { margin-bottom: 12px; }
.detail-row strong { color: #8B0000; }
.ritual-list { list-style: none; padding: 0; margin: 0; text-align: left; }
.host-info { background: #FFE4E1; padding: 20px; border-radius: 10px; border: 3px solid #8B0000; margin-bottom: 24px; }
.host-name { font-family: 'Cinzel', serif; font-size: 18px; font-weight: 700; }
.contact-text { color: #8B0000; font-weight: 600; margin: 12px 0 0; }
.final-blessing { padding: 16px; border-radius: 10px; border: 2px solid #191970; }
@media print { body { padding: 0; } .invitation-card { border-width: 3px; } }
"#;

/// Immutable, self-contained invitation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub title: String,
    pub html: String,
    pub digest: String,
    pub has_family_section: bool,
    pub has_contact_block: bool,
}

impl RenderedDocument {
    pub fn data_url(&self) -> String {
        format!(
            "data:text/html;charset=utf-8;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(self.html.as_bytes())
        )
    }

    pub fn len(&self) -> usize {
        self.html.len()
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

/// Minimal HTML text escaping for user-supplied values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn build_document(guest_name: &str, family_name: &str, phone_number: &str) -> RenderedDocument {
    let guest = guest_name.trim();
    let family_section = preview::family_line(family_name)
        .map(|line| format!(r#"<p class="family-name">{}</p>"#, escape_html(&line)));
    let contact_block = preview::contact_line(phone_number)
        .map(|line| format!(r#"<div class="contact-info"><p class="contact-text">{}</p></div>"#, escape_html(&line)));

    let title = format!("Complete {} Invitation - {}", CEREMONY.title, guest);
    let rituals: String = CEREMONY.rituals
        .iter()
        .map(|r| format!("<li>{}</li>", escape_html(r)))
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<style>{style}</style>
</head>
<body>
<div class="invitation-card">
<div class="card-header">
<div class="decorative-border"></div>
<div class="symbols"><span>🐘</span><span>ॐ</span><span>🏺</span></div>
</div>
<div class="card-content">
<div class="mantra">{opening}</div>
<h3 class="card-title">{title_sanskrit}</h3>
<h4 class="card-subtitle">{ceremony}</h4>
<p class="card-occasion">On the blessed occasion of {occasion}</p>
<div class="guest-name-section">
<p class="guest-name">{guest_line}</p>
{family_section}
</div>
<div class="invitation-text">
<p>You are cordially invited to join us for the auspicious {ceremony} as we conclude the sacred Ganesh Chaturthi festival with divine blessings.</p>
</div>
<div class="event-details">
<div class="detail-row"><strong>Date:</strong> {date}</div>
<div class="detail-row"><strong>Time:</strong> {time}</div>
<div class="detail-row"><strong>Occasion:</strong> {occasion}</div>
<div class="detail-row"><strong>Special Significance:</strong> {significance}</div>
</div>
<div class="ritual-details">
<h5>Sacred Rituals Include:</h5>
<ul class="ritual-list">{rituals}</ul>
</div>
<div class="mantra">{closing}</div>
<div class="host-info">
<strong>Invited by</strong><br>
<span class="host-name">{host}</span>
{contact_block}
</div>
<div class="final-blessing">
<p>{sanskrit_blessing}</p>
<p>{english_blessing}</p>
</div>
</div>
<div class="decorative-border"></div>
</div>
</body>
</html>
"#,
        title = escape_html(&title),
        style = STYLE,
        opening = CEREMONY.opening_mantra,
        title_sanskrit = CEREMONY.title_sanskrit,
        ceremony = CEREMONY.title,
        occasion = CEREMONY.occasion,
        guest_line = escape_html(&preview::guest_line(guest)),
        family_section = family_section.as_deref().unwrap_or(""),
        date = CEREMONY.date,
        time = CEREMONY.time,
        significance = escape_html(CEREMONY.significance),
        rituals = rituals,
        closing = CEREMONY.closing_mantra,
        host = escape_html(CEREMONY.host),
        contact_block = contact_block.as_deref().unwrap_or(""),
        sanskrit_blessing = CEREMONY.sanskrit_blessing,
        english_blessing = CEREMONY.english_blessing,
    );

    RenderedDocument {
        title,
        digest: compute_document_digest(&html),
        has_family_section: family_section.is_some(),
        has_contact_block: contact_block.is_some(),
        html,
    }
}

pub fn build_from_fields(fields: &InvitationFields) -> RenderedDocument {
    build_document(&fields.guest_name, &fields.family_name, &fields.phone_number)
}
