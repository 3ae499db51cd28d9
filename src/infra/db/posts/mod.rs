mod read;
mod types;
mod write;

use super::PostgresRepositories;

/// Joined projection shared by every post query. `p` must expose the `posts` columns.
const POST_COLUMNS: &str = "p.id, p.text, p.image, p.created_at, \
     u.id AS author_id, u.username AS author_username, u.display_name AS author_display_name, \
     g.id AS group_id, g.title AS group_title, g.slug AS group_slug";

const POST_JOINS: &str =
    " INNER JOIN users u ON u.id = p.author_id LEFT JOIN groups g ON g.id = p.group_id ";
