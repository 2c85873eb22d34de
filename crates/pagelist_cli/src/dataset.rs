//! Generated user directory served page by page

use pagelist_layout::list::Identifiable;
use serde::Serialize;

const FIRST_NAMES: [&str; 8] = [
    "Ada", "Grace", "Linus", "Barbara", "Ken", "Margaret", "Dennis", "Frances",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: String,
}

impl Identifiable for User {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// `total` users with ids `0..total`
pub fn generate(total: usize) -> Vec<User> {
    (0..total)
        .map(|i| {
            let first = FIRST_NAMES[i % FIRST_NAMES.len()];
            let number = i + 1;
            User {
                id: i as u32,
                name: format!("{first} #{number}"),
                email: format!("{}{number}@example.com", first.to_lowercase()),
            }
        })
        .collect()
}
