use rand::Rng;

use crate::model::Quote;

/// Fixed quotation pool for the guest and art views.
pub const QUOTES: &[(&str, &str)] = &[
    ("The best way to predict the future is to invent it.", "Alan Kay"),
    ("Simplicity is prerequisite for reliability.", "Edsger W. Dijkstra"),
    ("Every artist was first an amateur.", "Ralph Waldo Emerson"),
    ("Without music, life would be a mistake.", "Friedrich Nietzsche"),
    ("Art enables us to find ourselves and lose ourselves at the same time.", "Thomas Merton"),
    ("The secret of getting ahead is getting started.", "Mark Twain"),
    ("Well begun is half done.", "Aristotle"),
    ("Creativity takes courage.", "Henri Matisse"),
];

/// Draws one quotation uniformly from [`QUOTES`].
pub fn draw_quote<R: Rng>(rng: &mut R) -> Quote {
    let (text, author) = QUOTES[rng.random_range(0..QUOTES.len())];
    Quote {
        text: text.to_string(),
        author: author.to_string(),
    }
}
