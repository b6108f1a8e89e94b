//! Board catalog: tile descriptions and bonus challenges per board letter.
//! Pure data consumed by the presentation side; the tracker never reads text.

use crate::{BoardLetter, TileSet, TILES_PER_BOARD};

const TILES_A_TO_F: [[&str; 9]; 6] = [
    // A
    [
        "Tombs of Amascut\n\n1 purple from ToA (Fang, LB, Ward, Masori, Shadow, pet)",
        "Alchemical Hydra\n\n100 kc or 1 unique (eye, fang, heart, tail, leather, claw, jar, pet)",
        "Vardorvis\n\n125 kc or 1 unique (ingot, vestige, SRA piece, virtus, quartz, pet)",
        "Kalphite Queen\n\n150 kc or 1 unique (kq head (no tattered head), d pick, d2h, d chainbody, pet)",
        "Bandos\n\n150 kc or 1 unique (chestplate, tassets, boots, hilt, pet)",
        "Sarachnis\n\n150 kc or 1 unique (cudgel, jar, d med helm, pet)",
        "Moons of Peril\n\nAny 3 uniques",
        "Artio/Callisto\n\n100 kc or 1 unique (claws, d2h, d pick, voidwaker hilt, tyrannical ring, pet)",
        "Tempoross\n\n75 soaked pages or 1 unique (fish barrel, tackle box, x25 soaked pages, big harpoonfish, tome of water, d harpoon, pet)",
    ],
    // B
    [
        "Theatre of Blood\n\n1 purple from ToB (Avernic, Sang, Justiciar, Rapier, Scythe, pet)",
        "Araxxor\n\n100 kc or 1 unique (point, pommel, blade, fang, jar, pet)",
        "Whisperer\n\n75 kc or 1 unique (ingot, vestige, SRA piece, virtus, quartz, pet)",
        "Corporeal Beast\n\n50 kc or 1 unique (any sigil, spirit shield, holy elixir, jar, pet)",
        "Kree'arra\n\n150 kc or 1 unique (helm, chainskirt, chestplate, hilt, pet)",
        "Amoxliatl\n\n150 kc or 1 unique (glacial temotli, pet)",
        "Barrows\n\n1 helm, 1 body, and 1 legs from any set (does not have to match)",
        "Spindel/Vene\n\n150 kc or 1 unique (fangs, d2h, d pick, voidwaker gem, treasonous ring, pet)",
        "Hunter Rumors\n\n75 hunter rumors or quetzin pet",
    ],
    // C
    [
        "Chambers of Xeric\n\n1 purple from CoX (Dexterous/Arcane prayer scroll, Kodai, Buckler, Ancestral, Tbow, Dragon Claws, Elder Maul, Dinh's Bulwark, DHCB, pet)",
        "Kraken\n\n250 kc or 1 unique (trident, tentacle, jar, pet)",
        "Leviathan\n\n150 kc or 1 unique (ingot, vestige, SRA piece, virtus, quartz, pet)",
        "Gauntlet (CG or normal)\n\n25 corrupted gauntlet kc or 50 normal gauntlet kc or 1 unique (crystal weapon/armour seed, enhanced crystal weapon seed, pet)",
        "K'ril Tsutsaroth\n\n150 kc or 1 unique (z. spear, staff of the dead, hilt, pet)",
        "Giant Mole\n\n200 kc or 1 unique (long bone, curved bone, elite clue scroll, pet)",
        "King Black Dragon\n\n250 kc or 2 uniques (kbd heads, visage, d pick, pet)",
        "Calvarion/Vetion\n\n150 kc or 1 unique (skull, d2h, d pick, voidwaker blade, ring of the gods)",
        "Wintertodt\n\n200 burnt pages or 1 unique (d axe, tome of fire, any pyromancer piece, pet)",
    ],
    // D
    [
        "Nex\n\n200 Nihil Shards or 1 unique (Torva, Nihil Horn, Zaryte Vambs, Ancient Hilt, pet)",
        "Thermy\n\n250 kc or 1 unique (occult, smoke battlestaff, d chainbody, jar, pet)",
        "Duke Sucellus\n\n100 kc or 1 unique (ingot, vestige, SRA piece, virtus, quartz, pet)",
        "Vorkath\n\n100 kc or 1 unique (dragonbone necklace, either visage, head [50kc heads don't count], pet)",
        "Commander Zilyana\n\n150 kc or 1 unique (sara sword, sara light, acb, hilt, pet)",
        "Royal Titans\n\n150 kc or 1 unique (fire crown, ice crown, either prayer scroll)",
        "Scurrius\n\n300 kc or 10 spines or 1 pet",
        "Chaos Elemental\n\n150 kc or 1 unique (d pick, d2h, pet)",
        "Vale Totems\n\n1 unique (bowstring spool, fletching knife, greenman mask)",
    ],
    // E
    [
        "Fortis Colosseum\n\n2 uniques or 10,000 sunfire splinters (tonalztics of ralos, echo crystal, sunfire armor, pet)",
        "Cerberus\n\n150 kc or 1 unique (any crystal, smouldering stone, jar, pet)",
        "Phantom Muspah\n\n150 kc or 2 uniques (venator shard, ancient icon, pet)",
        "Zulrah\n\n175 kc or 1 unique (tanz fang, magic fang, visage, either mutagen, pet)",
        "Huey\n\n200 kc or 3 separate hide drops or 1 unique (tome of earth, dragon hunter wand, pet)",
        "Dagannoth Kings\n\n1 pet or all 4 rings (berserker, warrior, seers, archers)",
        "Obor\n\n35 obor chest kc or 1 unique (hill giant club)",
        "Scorpia\n\n150 kc or 1 unique (either ward shard, pet)",
        "Guardians of the Rift\n\n125 abyssal pearls or 1 unique (catalytic talisman, elemental talisman, abyssal needle, abyssal lantern, any dye, pet)",
    ],
    // F
    [
        "Doom of Mokhaiotl\n\n15,000 demon tears or 1 unique (cloth, eye of ayak, avernic treads, pet)",
        "Grotesque Guardians\n\n150 kc or 1 unique (granite gloves/ring/hammer, black tourmaline core, jar, pet)",
        "Yama\n\n100 oathplate shards or 1 unique (soulflame horn, oathplate, pet)",
        "Tormented Demons\n\n250 kc or 1 unique(burning claws, tormented synapse)",
        "Jad\n\n4 fire capes or pet",
        "Gemstone Crab\n\n1 diamond",
        "Bryophyta\n\n35 bryo chest kc or 1 unique (bryophyta's essence)",
        "Revenants\n\n1 unique (any wilderness weapon, ancient crystal, amulet of avarice, or any ancient artefact)",
        "Mastering Mixology\n\nPrescription Goggles (can split mox, aga, and lye resin #s across team)",
    ],
];

const BONUS_A_TO_F: [&str; 6] = [
    "As a team of 5, battle Scurrius until you obtain a Ratbane weapon for everyone from scratch, while wearing no gear. \n\nYou may used any obtained Ratbane weapons during this grind to obtain future Ratbane weapons. You may bring food and potions. Ironmen may complete their contribution in a solo instance. \n\n+5 bonus points.",
    "Complete the following activities ONLY with teammates: Wintertodt, Tempoross, Zalcano, Volcanic Mine, and Guardians of the Rift. No solos, masses or non-team members allowed. Please find & use an empty world. Take a team selfie at the end of each activity!\n\n+5 bonus points.",
    "Have up to 5 members of your team obtain both flippers and a mudskipper hat from mogres. Take ONE selfie (ss) with all team members wearing their flippers and hat. (Each team member must submit ss showing flipper and hat drops).\n\n+1 bonus point for every team member in the ss that is wearing flippers and mudskipper hat. \n\nMax of +5 bonus points.",
    "Complete a Raid of your choosing (200+ invo ToA or normal Cox/ToB) with at least 3 teammates. However, each player may only use gear totaled under 10m. Each team member should submit a screenshot(s) at the beginning of the raid, and another ss in the chest room, showing their full gear and inventory.\n\n+5 bonus points.",
    "Achieve platinum time in the Dragon Slayer 1 quest on a Quest Speedrunning world (+3 bonus points).\n\n+2 bonus points if you achieve Diamond time. \n\nMax of +5 bonus points.",
    "Acquire and complete 1 champion scroll.\n\n+5 bonus points.",
];

/// Full description for a tile (title on the first line)
pub fn tile_text(letter: BoardLetter, tile: u8) -> Option<&'static str> {
    if tile == 0 || tile > TILES_PER_BOARD {
        return None;
    }
    Some(TILES_A_TO_F[letter as usize][(tile - 1) as usize])
}

/// First line of the tile description
pub fn tile_title(letter: BoardLetter, tile: u8) -> Option<&'static str> {
    tile_text(letter, tile).and_then(|t| t.lines().next()).map(str::trim)
}

pub fn bonus_challenge(letter: BoardLetter) -> &'static str {
    BONUS_A_TO_F[letter as usize]
}

/// Bonus challenge as a quoted block
pub fn bonus_block(letter: BoardLetter) -> String {
    let quoted: Vec<String> = bonus_challenge(letter)
        .lines()
        .map(|line| format!("> {}", line))
        .collect();
    quoted.join("\n")
}

/// Remaining tiles as numbered titles with detail bullets
pub fn checklist(letter: BoardLetter, completed: &TileSet) -> String {
    let entries: Vec<String> = (1..=TILES_PER_BOARD)
        .filter(|tile| !completed.contains(tile))
        .filter_map(|tile| tile_text(letter, tile).map(|text| (tile, text)))
        .map(|(tile, text)| {
            let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
            let title = lines.next().unwrap_or("(Placeholder)");
            let mut entry = format!("Tile {} — **{}**", tile, title);
            for detail in lines {
                entry.push_str("\n- ");
                entry.push_str(detail);
            }
            entry
        })
        .collect();

    if entries.is_empty() {
        "*All tiles completed!*".to_string()
    } else {
        entries.join("\n\n")
    }
}
